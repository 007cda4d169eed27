//! Raw CSV row shapes, one struct per feature file. Field names double as
//! the CSV headers.
//!
//! Several row shapes repeat a per-repository total on every row
//! (`forks_count`, `commit_count`, ...). That denormalization is preserved
//! for output compatibility; the aggregation stage never reads those totals
//! back as a source of truth.

use crate::Result;
use chrono::{DateTime, Utc};
use ohno::IntoAppError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// The single metadata row for a repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoDataRecord {
    pub repo_name: String,
    pub description: Option<String>,
    pub language: Option<String>,
    pub owner: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub pushed_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub stargazers_count: u64,
    pub branches_count: u64,
    pub milestones_count: u64,
    pub pulls_count: u64,
    pub releases_count: u64,
    pub workflows_count: u64,
    pub open_issues_count: u64,
    pub watchers_count: u64,
    pub subscribers_count: u64,
    pub has_issues: bool,
    pub has_projects: bool,
    pub has_wiki: bool,
    pub has_pages: bool,
    pub has_downloads: bool,
    pub archived: bool,
    pub is_fork: bool,
}

/// One row per commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRecord {
    pub repo_name: String,
    pub commit_count: u64,
    pub commit_id: String,
    pub commit_date: DateTime<Utc>,
}

/// One row per issue or pull request. The two are interleaved in the same
/// remote collection and distinguished by `pr_iss_type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuePullRecord {
    pub pr_iss_type: String,
    pub state: String,
    pub pr_iss_opened_at: DateTime<Utc>,
    pub pr_iss_updated_at: DateTime<Utc>,
    pub pr_iss_closed_at: Option<DateTime<Utc>>,
}

/// One row per fork.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForkRecord {
    pub repo_name: String,
    pub forks_count: u64,
    pub forked_by: String,
    pub forked_at: DateTime<Utc>,
}

/// One row per star.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StargazerRecord {
    pub starred_by: String,
    pub starred_at: DateTime<Utc>,
}

/// One row per subscriber. `subscribed_at` is best-effort: the remote API
/// exposes no true subscription date, so the subscriber's account-creation
/// timestamp stands in when it can be resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherRecord {
    pub watchers_count: u64,
    pub subscribers_count: u64,
    pub subscriber: String,
    pub subscribed_at: Option<DateTime<Utc>>,
}

/// One row per named contributor from the default (non-exhaustive) listing.
/// The anonymous-inclusive total is only ever logged, never reconciled into
/// rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContributorRecord {
    pub contributor: String,
    pub contributor_created_at: Option<DateTime<Utc>>,
    pub contributors_count: u64,
}

/// Write a full table of records in one pass.
///
/// The rows land in a sibling temp file first and are renamed into place,
/// so a terminated run leaves either the complete file or nothing.
pub fn write_records<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let tmp_path = path.with_extension("csv.tmp");

    let mut writer = csv::Writer::from_path(&tmp_path).into_app_err_with(|| format!("unable to create '{}'", tmp_path.display()))?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush().into_app_err_with(|| format!("unable to flush '{}'", tmp_path.display()))?;
    drop(writer);

    fs::rename(&tmp_path, path).into_app_err_with(|| format!("unable to move '{}' into place", tmp_path.display()))?;
    Ok(())
}

/// Read a full table of records.
pub fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path).into_app_err_with(|| format!("unable to open '{}'", path.display()))?;

    let mut records = Vec::new();
    for record in reader.deserialize() {
        records.push(record.into_app_err_with(|| format!("malformed record in '{}'", path.display()))?);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_write_and_read_records() {
        let path = env::temp_dir().join("repo_pulse_test_fork_records.csv");

        let records = vec![
            ForkRecord {
                repo_name: "octocat/hello".to_string(),
                forks_count: 2,
                forked_by: "alice".to_string(),
                forked_at: "2024-01-01T03:00:00Z".parse().unwrap(),
            },
            ForkRecord {
                repo_name: "octocat/hello".to_string(),
                forks_count: 2,
                forked_by: "bob".to_string(),
                forked_at: "2024-01-02T10:00:00Z".parse().unwrap(),
            },
        ];

        write_records(&path, &records).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("csv.tmp").exists());

        let loaded: Vec<ForkRecord> = read_records(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].forked_by, "alice");
        assert_eq!(loaded[1].forked_at, records[1].forked_at);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_optional_timestamp_round_trips_empty() {
        let path = env::temp_dir().join("repo_pulse_test_issue_records.csv");

        let records = vec![IssuePullRecord {
            pr_iss_type: "Issue".to_string(),
            state: "open".to_string(),
            pr_iss_opened_at: "2024-05-06T07:08:09Z".parse().unwrap(),
            pr_iss_updated_at: "2024-05-07T07:08:09Z".parse().unwrap(),
            pr_iss_closed_at: None,
        }];

        write_records(&path, &records).unwrap();
        let loaded: Vec<IssuePullRecord> = read_records(&path).unwrap();
        assert_eq!(loaded[0].pr_iss_closed_at, None);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_read_missing_file_errors() {
        let result: Result<Vec<ForkRecord>> = read_records(Path::new("/nonexistent/forks.csv"));
        assert!(result.is_err());
    }
}
