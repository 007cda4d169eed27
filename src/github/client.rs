use crate::Result;
use crate::github::models::{UserProfile, WorkflowList};
use crate::github::rate_limit::RateBudget;
use crate::github::repo_id::RepoId;
use chrono::DateTime;
use octocrab::{Octocrab, models::issues::Issue};
use ohno::{IntoAppError, app_err};
use reqwest::header::{ACCEPT, LINK};
use serde::de::DeserializeOwned;
use std::sync::LazyLock;

const LOG_TARGET: &str = "    github";

const API_ROOT: &str = "https://api.github.com";

/// Page size used for every paginated collection.
pub const PER_PAGE: u8 = 100;

/// Pattern to extract the last page number from the GitHub API Link header
static PAGE_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| regex::Regex::new(r"page=(\d+)>; rel=.last.").expect("invalid regex"));

/// GitHub API client. Wraps octocrab for the repository, issue, and
/// rate-limit endpoints and a plain HTTP client for the list endpoints
/// fetched with small local models.
#[derive(Debug, Clone)]
pub struct Client {
    octocrab: Octocrab,
    http: reqwest::Client,
    authenticated: bool,
}

impl Client {
    /// Build a client, authenticating with the given personal access token
    /// when one is provided.
    ///
    /// A provided token is confirmed with an identity call up front so a bad
    /// credential is reported with its status detail before any fetch
    /// begins. Absence of a token degrades to the unauthenticated quota.
    pub async fn authenticate(token: Option<&str>) -> Result<Self> {
        let mut builder = Octocrab::builder();
        let mut client_builder = reqwest::Client::builder().user_agent("repo-pulse");
        let has_token = token.is_some();

        if let Some(t) = token {
            let mut auth_val = reqwest::header::HeaderValue::from_str(&format!("token {t}"))?;
            auth_val.set_sensitive(true);

            let mut headers = reqwest::header::HeaderMap::new();
            let _ = headers.insert(reqwest::header::AUTHORIZATION, auth_val);

            client_builder = client_builder.default_headers(headers);

            builder = builder.personal_token(t);
        } else {
            println!(
                "Tip: no GitHub access token was provided. Get an access token from GitHub to raise the \
                 request quota from 60 to 5000 per hour (set GITHUB_TOKEN or pass --github-token)."
            );
        }

        let client = Self {
            octocrab: builder.build()?,
            http: client_builder.build()?,
            authenticated: has_token,
        };

        if has_token {
            let user = client
                .octocrab
                .current()
                .user()
                .await
                .into_app_err("GitHub rejected the provided access token")?;
            log::info!(target: LOG_TARGET, "Authenticated to GitHub as '{}'", user.login);
        }

        client.log_budget().await;

        Ok(client)
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Query the current rate-limit budget.
    pub async fn rate_budget(&self) -> Result<RateBudget> {
        let rate_limit = self.octocrab.ratelimit().get().await?;

        let reset_at = DateTime::from_timestamp(i64::try_from(rate_limit.rate.reset)?, 0)
            .ok_or_else(|| app_err!("rate limit reset timestamp out of range"))?;

        Ok(RateBudget {
            remaining: rate_limit.rate.remaining as u64,
            limit: rate_limit.rate.limit as u64,
            reset_at,
        })
    }

    async fn log_budget(&self) {
        match self.rate_budget().await {
            Ok(budget) => {
                log::info!(target: LOG_TARGET, "Rate limit budget: {} of {} calls remaining", budget.remaining, budget.limit);
            }
            Err(e) => log::warn!(target: LOG_TARGET, "Could not query the rate limit budget: {e:#}"),
        }
    }

    /// Fetch a repository's metadata.
    pub async fn get_repo(&self, repo: &RepoId) -> Result<octocrab::models::Repository> {
        Ok(self.octocrab.repos(repo.owner(), repo.name()).get().await?)
    }

    /// Fetch a user's profile, used to resolve account-creation timestamps
    /// that list responses do not carry.
    pub async fn get_user(&self, login: &str) -> Result<UserProfile> {
        self.get_json(&format!("{API_ROOT}/users/{login}"), None).await
    }

    /// Fetch one page of a repository collection (e.g. "forks",
    /// "stargazers"). `collection` may carry its own query string. An
    /// optional media type overrides the Accept header (used for stargazer
    /// timestamps).
    pub async fn list_page<T: DeserializeOwned>(&self, repo: &RepoId, collection: &str, page: u32, accept: Option<&str>) -> Result<Vec<T>> {
        let sep = if collection.contains('?') { '&' } else { '?' };
        let url = format!("{API_ROOT}/repos/{}/{collection}{sep}per_page={PER_PAGE}&page={page}", repo.path());
        self.get_json(&url, accept).await
    }

    /// Count the items in a repository collection without downloading them,
    /// by asking for one item per page and reading the last page number off
    /// the Link header. Single-page collections carry no Link header and
    /// fall back to counting the returned array.
    pub async fn count_collection(&self, repo: &RepoId, collection: &str) -> Result<u64> {
        let sep = if collection.contains('?') { '&' } else { '?' };
        let url = format!("{API_ROOT}/repos/{}/{collection}{sep}per_page=1", repo.path());

        log::debug!(target: LOG_TARGET, "Fetching count via Link header from '{url}'");

        let resp = self.http.get(&url).send().await?;

        if let Some(link_header) = resp.headers().get(LINK) {
            let link_str = link_header.to_str()?;
            if let Some(count) = PAGE_REGEX.captures(link_str).and_then(|caps| caps.get(1)) {
                return Ok(count.as_str().parse()?);
            }
        }

        let bytes = resp
            .bytes()
            .await
            .into_app_err_with(|| format!("could not read response body from '{url}'"))?;

        count_json_array_elements(&bytes).into_app_err_with(|| format!("could not count items in JSON response from '{url}'"))
    }

    /// The total workflow count; the workflows endpoint returns an object
    /// with an explicit count rather than a bare array.
    pub async fn workflow_count(&self, repo: &RepoId) -> Result<u64> {
        let url = format!("{API_ROOT}/repos/{}/actions/workflows?per_page=1", repo.path());
        let list: WorkflowList = self.get_json(&url, None).await?;
        Ok(list.total_count)
    }

    /// Fetch the first page of the repository's issues and pull requests
    /// (GitHub's issues endpoint interleaves both).
    pub async fn first_issue_page(&self, repo: &RepoId) -> Result<octocrab::Page<Issue>> {
        Ok(self
            .octocrab
            .issues(repo.owner(), repo.name())
            .list()
            .state(octocrab::params::State::All)
            .per_page(PER_PAGE)
            .send()
            .await?)
    }

    /// Follow an issue page's `next` link. Returns `None` after the last
    /// page.
    pub async fn next_issue_page(&self, page: &octocrab::Page<Issue>) -> Result<Option<octocrab::Page<Issue>>> {
        Ok(self.octocrab.get_page::<Issue>(&page.next).await?)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, accept: Option<&str>) -> Result<T> {
        log::debug!(target: LOG_TARGET, "Fetching '{url}'");

        let mut request = self.http.get(url);
        if let Some(media_type) = accept {
            request = request.header(ACCEPT, media_type);
        }

        let resp = request
            .send()
            .await?
            .error_for_status()
            .into_app_err_with(|| format!("GitHub request failed for '{url}'"))?;

        resp.json::<T>().await.into_app_err_with(|| format!("malformed response from '{url}'"))
    }
}

/// Count elements in a JSON array without allocating parsed values.
fn count_json_array_elements(json: &[u8]) -> Result<u64> {
    use serde::de::IgnoredAny;

    let array: Vec<IgnoredAny> = serde_json::from_slice(json).into_app_err("malformed JSON while counting array elements")?;

    Ok(array.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_json_array_elements() {
        assert_eq!(count_json_array_elements(b"[]").unwrap(), 0);
        assert_eq!(count_json_array_elements(br#"[{"id": 1}]"#).unwrap(), 1);
        assert_eq!(count_json_array_elements(br#"[{"id": 1}, {"id": 2}, {"id": 3}]"#).unwrap(), 3);

        let _ = count_json_array_elements(b"[{broken").unwrap_err();
    }

    #[test]
    fn test_link_header_last_page_pattern() {
        let link = r#"<https://api.github.com/repos/o/r/forks?per_page=1&page=2>; rel="next", <https://api.github.com/repos/o/r/forks?per_page=1&page=734>; rel="last""#;
        let caps = PAGE_REGEX.captures(link).unwrap();
        assert_eq!(caps.get(1).unwrap().as_str(), "734");
    }
}
