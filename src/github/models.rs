//! Minimal deserialization models for the GitHub list endpoints fetched
//! over plain HTTP. Only the fields the pipeline persists are declared;
//! everything else in the responses is ignored.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A user reference as embedded in list responses (fork owners,
/// stargazers, subscribers). List responses carry no account timestamps.
#[derive(Debug, Clone, Deserialize)]
pub struct UserRef {
    pub login: String,
}

/// A full user profile from `/users/{login}`, looked up when an account
/// creation timestamp is needed.
#[derive(Debug, Deserialize)]
pub struct UserProfile {
    pub login: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// One fork from `/repos/{owner}/{repo}/forks`.
#[derive(Debug, Deserialize)]
pub struct Fork {
    pub full_name: String,
    pub owner: Option<UserRef>,
    /// When the fork was created, i.e. when the repository was forked.
    pub created_at: DateTime<Utc>,
}

/// One stargazer from `/repos/{owner}/{repo}/stargazers` fetched with the
/// `application/vnd.github.star+json` media type, which adds `starred_at`.
#[derive(Debug, Deserialize)]
pub struct Stargazer {
    pub starred_at: DateTime<Utc>,
    pub user: Option<UserRef>,
}

/// One commit from `/repos/{owner}/{repo}/commits`.
#[derive(Debug, Deserialize)]
pub struct CommitInfo {
    pub sha: String,
    pub commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
pub struct CommitDetail {
    pub author: Option<CommitSignature>,
    pub committer: Option<CommitSignature>,
}

#[derive(Debug, Deserialize)]
pub struct CommitSignature {
    pub date: Option<DateTime<Utc>>,
}

impl CommitInfo {
    /// The commit timestamp, preferring the author date over the committer
    /// date (rebases and cherry-picks rewrite the latter).
    #[must_use]
    pub fn date(&self) -> Option<DateTime<Utc>> {
        self.commit
            .author
            .as_ref()
            .and_then(|sig| sig.date)
            .or_else(|| self.commit.committer.as_ref().and_then(|sig| sig.date))
    }
}

/// One contributor from `/repos/{owner}/{repo}/contributors`. Anonymous
/// contributors have no login.
#[derive(Debug, Deserialize)]
pub struct Contributor {
    pub login: Option<String>,
}

/// The `/repos/{owner}/{repo}/actions/workflows` response. Unlike the other
/// collections this endpoint returns an object with an explicit total.
#[derive(Debug, Deserialize)]
pub struct WorkflowList {
    pub total_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_date_prefers_author() {
        let info: CommitInfo = serde_json::from_str(
            r#"{
                "sha": "abc123",
                "commit": {
                    "author": {"date": "2024-01-01T10:00:00Z"},
                    "committer": {"date": "2024-02-02T10:00:00Z"}
                }
            }"#,
        )
        .unwrap();

        assert_eq!(info.date().unwrap().to_rfc3339(), "2024-01-01T10:00:00+00:00");
    }

    #[test]
    fn test_commit_date_falls_back_to_committer() {
        let info: CommitInfo = serde_json::from_str(
            r#"{
                "sha": "abc123",
                "commit": {
                    "author": null,
                    "committer": {"date": "2024-02-02T10:00:00Z"}
                }
            }"#,
        )
        .unwrap();

        assert_eq!(info.date().unwrap().to_rfc3339(), "2024-02-02T10:00:00+00:00");
    }

    #[test]
    fn test_stargazer_with_dates_media_type() {
        let star: Stargazer = serde_json::from_str(r#"{"starred_at": "2024-03-04T05:06:07Z", "user": {"login": "octocat"}}"#).unwrap();
        assert_eq!(star.user.unwrap().login, "octocat");
    }

    #[test]
    fn test_anonymous_contributor() {
        let contributor: Contributor = serde_json::from_str(r#"{"type": "Anonymous", "contributions": 7}"#).unwrap();
        assert!(contributor.login.is_none());

        let named: Contributor = serde_json::from_str(r#"{"login": "octocat", "contributions": 42}"#).unwrap();
        assert_eq!(named.login.as_deref(), Some("octocat"));
    }
}
