use crate::Result;
use crate::config::Features;
use crate::fetch::{Feature, RepoDataRecord, discover_repo_dirs, read_records, write_records};
use crate::transform::{SeriesResult, Transformer};
use chrono::{DateTime, Utc};
use ohno::{IntoAppError, bail};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

const LOG_TARGET: &str = "aggregator";

/// Name of the per-repository combined time-series file.
pub const ALL_FEATURE_FILE: &str = "all_feature.csv";

/// Name of the cross-repository metadata table.
pub const GENERIC_FILE: &str = "generic_repos_data.csv";

/// A repository metadata row in the cross-repository table. Identical to
/// the raw row plus the derived age column, spelled out because the csv
/// crate does not flatten nested structs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenericRepoRecord {
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
    pub age_in_weeks: Option<i64>,
}

impl From<RepoDataRecord> for GenericRepoRecord {
    fn from(r: RepoDataRecord) -> Self {
        Self {
            repo_name: r.repo_name,
            description: r.description,
            language: r.language,
            owner: r.owner,
            created_at: r.created_at,
            pushed_at: r.pushed_at,
            updated_at: r.updated_at,
            stargazers_count: r.stargazers_count,
            branches_count: r.branches_count,
            milestones_count: r.milestones_count,
            pulls_count: r.pulls_count,
            releases_count: r.releases_count,
            workflows_count: r.workflows_count,
            open_issues_count: r.open_issues_count,
            watchers_count: r.watchers_count,
            subscribers_count: r.subscribers_count,
            has_issues: r.has_issues,
            has_projects: r.has_projects,
            has_wiki: r.has_wiki,
            has_pages: r.has_pages,
            has_downloads: r.has_downloads,
            archived: r.archived,
            is_fork: r.is_fork,
            age_in_weeks: None,
        }
    }
}

/// Whole weeks between a repository's creation and its last update.
/// Partial weeks are truncated.
#[must_use]
pub fn age_in_weeks(created_at: DateTime<Utc>, updated_at: DateTime<Utc>) -> i64 {
    updated_at.signed_duration_since(created_at).num_days() / 7
}

/// Combines per-repository time series and builds the cross-repository
/// metadata table.
#[derive(Debug)]
pub struct FeatureAggregator {
    transformer: Transformer,
    raw_root: PathBuf,
    processed_root: PathBuf,
    final_path: PathBuf,
    files: Features,
}

impl FeatureAggregator {
    #[must_use]
    pub fn new(raw_root: PathBuf, processed_root: PathBuf, final_path: PathBuf, files: Features) -> Self {
        let transformer = Transformer::new(raw_root.clone(), processed_root.clone(), files.clone());
        Self {
            transformer,
            raw_root,
            processed_root,
            final_path,
            files,
        }
    }

    /// Transform every time-series feature of one raw repository directory
    /// and outer-join them into its `all_feature.csv`.
    ///
    /// A feature whose raw file is absent or fails to transform narrows
    /// the combined table instead of sinking the repository; at least one
    /// feature must survive.
    pub fn combine_repo_features(&self, repo_dir: &Path) -> Result<PathBuf> {
        let mut found = Vec::new();

        for feature in Feature::TIME_SERIES {
            match self.transformer.transform_and_write(repo_dir, feature) {
                SeriesResult::Found(series) => found.push(series),
                SeriesResult::RawMissing { feature, path } => {
                    log::warn!(target: LOG_TARGET, "No raw {feature} file at '{}', leaving it out of the combined table", path.display());
                }
                SeriesResult::Failed(e) => {
                    log::error!(target: LOG_TARGET, "Could not transform {feature} under '{}': {e:#}", repo_dir.display());
                }
            }
        }

        let mut series = found.into_iter();
        let Some(first) = series.next() else {
            bail!("no time-series feature could be transformed under '{}'", repo_dir.display());
        };
        let mut combined = series.fold(first, |joined, next| joined.outer_join(&next));

        // A single surviving feature never went through a join, so it still
        // carries its source index name.
        combined.rename_index("date");

        let out_path = self.transformer.processed_dir(repo_dir).join(ALL_FEATURE_FILE);
        combined.write_csv(&out_path)?;
        log::info!(target: LOG_TARGET, "Wrote combined series with {} columns to '{}'", combined.columns().len(), out_path.display());

        Ok(out_path)
    }

    /// Combine every repository under the raw root. Returns the number of
    /// repositories that failed.
    pub fn combine_all(&self) -> Result<u32> {
        let mut failures = 0;

        for repo_dir in discover_repo_dirs(&self.raw_root)? {
            if let Err(e) = self.combine_repo_features(&repo_dir) {
                log::error!(target: LOG_TARGET, "Failed to combine '{}': {e:#}", repo_dir.display());
                failures += 1;
            }
        }

        Ok(failures)
    }

    /// Gather every repository's metadata row into one deduplicated table
    /// under the processed root. Re-fetched duplicates of the same
    /// repository and language are collapsed.
    pub fn aggregate_generic_metadata(&self) -> Result<PathBuf> {
        let mut rows: Vec<GenericRepoRecord> = Vec::new();
        let mut seen: HashSet<(String, Option<String>)> = HashSet::new();

        for repo_dir in discover_repo_dirs(&self.raw_root)? {
            let raw_path = repo_dir.join(format!("{}.csv", self.files.stem(Feature::RepoData)));
            if !raw_path.is_file() {
                log::warn!(target: LOG_TARGET, "No metadata file at '{}', skipping", raw_path.display());
                continue;
            }

            for record in read_records::<RepoDataRecord>(&raw_path)? {
                if seen.insert((record.repo_name.clone(), record.language.clone())) {
                    rows.push(record.into());
                } else {
                    log::debug!(target: LOG_TARGET, "Dropping duplicate metadata row for '{}'", record.repo_name);
                }
            }
        }

        if rows.is_empty() {
            bail!("no repository metadata found under '{}'", self.raw_root.display());
        }

        fs::create_dir_all(&self.processed_root)
            .into_app_err_with(|| format!("unable to create '{}'", self.processed_root.display()))?;

        let out_path = self.processed_root.join(GENERIC_FILE);
        write_records(&out_path, &rows)?;
        log::info!(target: LOG_TARGET, "Wrote {} metadata rows to '{}'", rows.len(), out_path.display());

        Ok(out_path)
    }

    /// Fill the age column of the metadata table, rewriting it in place
    /// and publishing the aged table as the final output file.
    pub fn compute_age(&self) -> Result<PathBuf> {
        let table_path = self.processed_root.join(GENERIC_FILE);
        let mut rows: Vec<GenericRepoRecord> = read_records(&table_path)?;

        for row in &mut rows {
            row.age_in_weeks = match (row.created_at, row.updated_at) {
                (Some(created), Some(updated)) => Some(age_in_weeks(created, updated)),
                _ => {
                    log::warn!(target: LOG_TARGET, "Repository '{}' is missing timestamps, leaving its age unset", row.repo_name);
                    None
                }
            };
        }

        write_records(&table_path, &rows)?;

        if let Some(final_dir) = self.final_path.parent() {
            fs::create_dir_all(final_dir).into_app_err_with(|| format!("unable to create '{}'", final_dir.display()))?;
        }
        write_records(&self.final_path, &rows)?;
        log::info!(target: LOG_TARGET, "Wrote final table with {} rows to '{}'", rows.len(), self.final_path.display());

        Ok(self.final_path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{CommitRecord, ForkRecord};
    use std::env;

    fn roots(name: &str) -> (PathBuf, FeatureAggregator) {
        let base = env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&base);
        let raw = base.join("raw");
        fs::create_dir_all(&raw).unwrap();

        let aggregator = FeatureAggregator::new(
            raw.clone(),
            base.join("processed"),
            base.join("final").join("all_repos_data.csv"),
            Features::default(),
        );
        (base, aggregator)
    }

    fn repo_data_record(name: &str, created: &str, updated: &str) -> RepoDataRecord {
        RepoDataRecord {
            repo_name: name.to_string(),
            description: None,
            language: Some("Rust".to_string()),
            owner: Some("octocat".to_string()),
            created_at: Some(created.parse().unwrap()),
            pushed_at: None,
            updated_at: Some(updated.parse().unwrap()),
            stargazers_count: 10,
            branches_count: 1,
            milestones_count: 0,
            pulls_count: 2,
            releases_count: 1,
            workflows_count: 0,
            open_issues_count: 3,
            watchers_count: 10,
            subscribers_count: 4,
            has_issues: true,
            has_projects: false,
            has_wiki: true,
            has_pages: false,
            has_downloads: true,
            archived: false,
            is_fork: false,
        }
    }

    #[test]
    fn test_age_truncates_partial_weeks() {
        let created = "2024-01-01T00:00:00Z".parse().unwrap();
        let updated = "2024-03-14T00:00:00Z".parse().unwrap(); // 73 days later
        assert_eq!(age_in_weeks(created, updated), 10);
    }

    #[test]
    fn test_generic_table_deduplicates_rows() {
        let (base, aggregator) = roots("repo_pulse_test_agg_dedup");

        let repo_a = base.join("raw/repo_a");
        let repo_b = base.join("raw/repo_b");
        fs::create_dir_all(&repo_a).unwrap();
        fs::create_dir_all(&repo_b).unwrap();

        let row = repo_data_record("octocat/hello", "2024-01-01T00:00:00Z", "2024-03-14T00:00:00Z");
        write_records(&repo_a.join("repo_data.csv"), &[row.clone()]).unwrap();
        write_records(&repo_b.join("repo_data.csv"), &[row, repo_data_record("octocat/other", "2024-01-01T00:00:00Z", "2024-02-01T00:00:00Z")]).unwrap();

        let out_path = aggregator.aggregate_generic_metadata().unwrap();
        let rows: Vec<GenericRepoRecord> = read_records(&out_path).unwrap();
        assert_eq!(rows.len(), 2);

        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn test_compute_age_publishes_final_table() {
        let (base, aggregator) = roots("repo_pulse_test_agg_age");

        let repo = base.join("raw/repo");
        fs::create_dir_all(&repo).unwrap();
        write_records(
            &repo.join("repo_data.csv"),
            &[repo_data_record("octocat/hello", "2024-01-01T00:00:00Z", "2024-03-14T00:00:00Z")],
        )
        .unwrap();

        let _ = aggregator.aggregate_generic_metadata().unwrap();
        let final_path = aggregator.compute_age().unwrap();

        let final_rows: Vec<GenericRepoRecord> = read_records(&final_path).unwrap();
        assert_eq!(final_rows[0].age_in_weeks, Some(10));

        let processed_rows: Vec<GenericRepoRecord> = read_records(&base.join("processed").join(GENERIC_FILE)).unwrap();
        assert_eq!(processed_rows[0].age_in_weeks, Some(10));

        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn test_combine_repo_features_skips_missing_features() {
        let (base, aggregator) = roots("repo_pulse_test_agg_combine");

        let repo = base.join("raw/repo");
        fs::create_dir_all(&repo).unwrap();

        // Only two of the four time-series features are present.
        write_records(
            &repo.join("commits.csv"),
            &[CommitRecord {
                repo_name: "o/hello".into(),
                commit_count: 1,
                commit_id: "aaa".into(),
                commit_date: "2024-01-01T08:00:00Z".parse().unwrap(),
            }],
        )
        .unwrap();
        write_records(
            &repo.join("forks.csv"),
            &[ForkRecord {
                repo_name: "o/hello".into(),
                forks_count: 1,
                forked_by: "alice".into(),
                forked_at: "2024-01-02T08:00:00Z".parse().unwrap(),
            }],
        )
        .unwrap();

        let out_path = aggregator.combine_repo_features(&repo).unwrap();
        assert_eq!(out_path, base.join("processed/repo").join(ALL_FEATURE_FILE));

        let text = fs::read_to_string(&out_path).unwrap();
        assert!(text.starts_with("date,commit_count,forks_count\n"));
        assert!(text.contains("2024-01-01,1,0\n"));
        assert!(text.contains("2024-01-02,0,1\n"));

        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn test_combine_single_feature_is_date_indexed() {
        let (base, aggregator) = roots("repo_pulse_test_agg_single");

        let repo = base.join("raw/repo");
        fs::create_dir_all(&repo).unwrap();
        write_records(
            &repo.join("commits.csv"),
            &[CommitRecord {
                repo_name: "o/hello".into(),
                commit_count: 1,
                commit_id: "aaa".into(),
                commit_date: "2024-01-01T08:00:00Z".parse().unwrap(),
            }],
        )
        .unwrap();

        let out_path = aggregator.combine_repo_features(&repo).unwrap();
        let text = fs::read_to_string(&out_path).unwrap();
        assert!(text.starts_with("date,commit_count\n"));

        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn test_combine_fails_with_no_features() {
        let (base, aggregator) = roots("repo_pulse_test_agg_empty");

        let repo = base.join("raw/repo");
        fs::create_dir_all(&repo).unwrap();

        assert!(aggregator.combine_repo_features(&repo).is_err());

        let _ = fs::remove_dir_all(&base);
    }
}
