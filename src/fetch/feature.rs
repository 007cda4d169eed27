/// One category of repository activity data collected by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Feature {
    RepoData,
    Commits,
    IssuesPulls,
    Forks,
    Stargazer,
    Watchers,
    Contributors,
}

impl Feature {
    /// Fetch order for one repository. Metadata lands first: it is the
    /// cheapest fetch and later age computation depends on it.
    pub const FETCH_ORDER: [Self; 7] = [
        Self::RepoData,
        Self::Commits,
        Self::Forks,
        Self::IssuesPulls,
        Self::Stargazer,
        Self::Watchers,
        Self::Contributors,
    ];

    /// The features that have a daily time-series transform.
    pub const TIME_SERIES: [Self; 4] = [Self::Commits, Self::Forks, Self::Stargazer, Self::IssuesPulls];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_file_stems() {
        assert_eq!(Feature::RepoData.to_string(), "repo_data");
        assert_eq!(Feature::IssuesPulls.to_string(), "issues_pulls");
        assert_eq!(Feature::Stargazer.to_string(), "stargazer");
    }

    #[test]
    fn test_fetch_order_starts_with_metadata() {
        assert_eq!(Feature::FETCH_ORDER[0], Feature::RepoData);
        assert_eq!(Feature::FETCH_ORDER.len(), 7);
    }
}
