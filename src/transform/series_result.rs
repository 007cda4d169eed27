use crate::fetch::Feature;
use crate::transform::DailySeries;
use ohno::{AppError, app_err};
use std::path::PathBuf;

/// The outcome of transforming one raw feature file.
///
/// A missing raw file is a distinct, expected outcome rather than an error:
/// it usually means the fetch stage skipped or failed that one feature, and
/// callers choose whether that sinks the repository or just narrows it.
#[derive(Debug)]
pub enum SeriesResult {
    /// The raw file existed and transformed cleanly.
    Found(DailySeries),

    /// The raw file for the feature does not exist.
    RawMissing { feature: Feature, path: PathBuf },

    /// The raw file existed but could not be transformed.
    Failed(AppError),
}

impl SeriesResult {
    #[must_use]
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// The series, discarding the failure detail.
    #[must_use]
    pub fn ok(self) -> Option<DailySeries> {
        match self {
            Self::Found(series) => Some(series),
            Self::RawMissing { .. } | Self::Failed(_) => None,
        }
    }

    /// Convert into a `Result`, turning a missing raw file into an error
    /// that names the feature and path.
    pub fn into_result(self) -> crate::Result<DailySeries> {
        match self {
            Self::Found(series) => Ok(series),
            Self::RawMissing { feature, path } => Err(app_err!("no raw {feature} file at '{}'; fetch it first", path.display())),
            Self::Failed(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_missing_converts_to_named_error() {
        let result = SeriesResult::RawMissing {
            feature: Feature::Forks,
            path: PathBuf::from("/data/raw/repo/forks.csv"),
        };

        assert!(!result.is_found());
        let e = result.into_result().unwrap_err();
        assert!(e.to_string().contains("forks"));
        assert!(e.to_string().contains("/data/raw/repo/forks.csv"));
    }
}
