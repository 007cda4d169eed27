use crate::Result;
use crate::config::Features;
use crate::fetch::{CommitRecord, Feature, ForkRecord, IssuePullRecord, StargazerRecord, read_records};
use crate::transform::daily_series::DailySeries;
use crate::transform::series_result::SeriesResult;
use chrono::{DateTime, NaiveDate, Utc};
use ohno::{IntoAppError, app_err};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const LOG_TARGET: &str = "transformer";

/// Turns raw per-event feature files into daily time series.
///
/// Each supported feature becomes a date-indexed CSV under the processed
/// root, mirroring the repository's position under the raw root so any
/// grouping layer survives the stage.
#[derive(Debug)]
pub struct Transformer {
    raw_root: PathBuf,
    processed_root: PathBuf,
    files: Features,
}

impl Transformer {
    #[must_use]
    pub fn new(raw_root: PathBuf, processed_root: PathBuf, files: Features) -> Self {
        Self {
            raw_root,
            processed_root,
            files,
        }
    }

    /// Build the daily series for one feature of one raw repository
    /// directory.
    #[must_use]
    pub fn transform(&self, repo_dir: &Path, feature: Feature) -> SeriesResult {
        let raw_path = repo_dir.join(format!("{}.csv", self.files.stem(feature)));
        if !raw_path.is_file() {
            return SeriesResult::RawMissing { feature, path: raw_path };
        }

        let built = match feature {
            Feature::Commits => commit_series(&raw_path),
            Feature::Forks => fork_series(&raw_path),
            Feature::Stargazer => stargazer_series(&raw_path),
            Feature::IssuesPulls => issue_pull_series(&raw_path),
            Feature::RepoData | Feature::Watchers | Feature::Contributors => {
                Err(app_err!("{feature} has no daily time-series transform"))
            }
        };

        match built {
            Ok(series) => SeriesResult::Found(series),
            Err(e) => SeriesResult::Failed(e),
        }
    }

    /// Build the series and write it under the processed root.
    pub fn transform_and_write(&self, repo_dir: &Path, feature: Feature) -> SeriesResult {
        let result = self.transform(repo_dir, feature);

        if let SeriesResult::Found(series) = &result {
            let write = || -> Result<()> {
                let out_dir = self.processed_dir(repo_dir);
                fs::create_dir_all(&out_dir).into_app_err_with(|| format!("unable to create '{}'", out_dir.display()))?;

                let out_path = out_dir.join(format!("{}.csv", self.files.stem(feature)));
                series.write_csv(&out_path)?;
                log::info!(target: LOG_TARGET, "Wrote {} daily rows to '{}'", series.len(), out_path.display());
                Ok(())
            };

            if let Err(e) = write() {
                return SeriesResult::Failed(e);
            }
        }

        result
    }

    /// Where one repository's processed files land: the raw directory's
    /// position, re-rooted under the processed root.
    #[must_use]
    pub fn processed_dir(&self, repo_dir: &Path) -> PathBuf {
        match repo_dir.strip_prefix(&self.raw_root) {
            Ok(relative) => self.processed_root.join(relative),
            Err(_) => self.processed_root.join(repo_dir.file_name().unwrap_or_default()),
        }
    }
}

fn bucket_by_day(timestamps: impl IntoIterator<Item = DateTime<Utc>>) -> BTreeMap<NaiveDate, u64> {
    let mut counts = BTreeMap::new();
    for ts in timestamps {
        *counts.entry(ts.date_naive()).or_insert(0) += 1;
    }
    counts
}

/// Commits per day. Unlike the other series, the calendar gaps between the
/// first and last commit are filled with explicit zeros.
fn commit_series(raw_path: &Path) -> Result<DailySeries> {
    let records: Vec<CommitRecord> = read_records(raw_path)?;

    let mut series = DailySeries::from_counts("commit_date", "commit_count", bucket_by_day(records.into_iter().map(|r| r.commit_date)));
    series.fill_calendar();
    Ok(series)
}

fn fork_series(raw_path: &Path) -> Result<DailySeries> {
    let records: Vec<ForkRecord> = read_records(raw_path)?;
    Ok(DailySeries::from_counts("forked_at", "forks_count", bucket_by_day(records.into_iter().map(|r| r.forked_at))))
}

fn stargazer_series(raw_path: &Path) -> Result<DailySeries> {
    let records: Vec<StargazerRecord> = read_records(raw_path)?;
    Ok(DailySeries::from_counts("starred_at", "Stars_count", bucket_by_day(records.into_iter().map(|r| r.starred_at))))
}

/// Issues and pull requests become three columns, one per lifecycle event,
/// outer-joined on the event date.
fn issue_pull_series(raw_path: &Path) -> Result<DailySeries> {
    let records: Vec<IssuePullRecord> = read_records(raw_path)?;

    let opened = bucket_by_day(records.iter().map(|r| r.pr_iss_opened_at));
    let updated = bucket_by_day(records.iter().map(|r| r.pr_iss_updated_at));
    let closed = bucket_by_day(records.iter().filter_map(|r| r.pr_iss_closed_at));

    let opened = DailySeries::from_counts("pr_iss_opened_at", "pr_iss_Open_count", opened);
    let updated = DailySeries::from_counts("pr_iss_updated_at", "pr_iss_updated_count", updated);
    let closed = DailySeries::from_counts("pr_iss_closed_at", "pr_is_closed_count", closed);

    Ok(opened.outer_join(&updated).outer_join(&closed))
}
