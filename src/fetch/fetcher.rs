use crate::Result;
use crate::fetch::Feature;
use crate::fetch::records::{
    CommitRecord, ContributorRecord, ForkRecord, IssuePullRecord, RepoDataRecord, StargazerRecord, WatcherRecord, write_records,
};
use crate::fetch::store::CollectionStore;
use crate::github::{Client, CommitInfo, Contributor, Fork, PER_PAGE, RateLimiter, RepoId, Stargazer, UserRef};
use octocrab::models::IssueState;
use std::path::PathBuf;

const LOG_TARGET: &str = "   fetcher";

/// Budget floors. A fetch step only starts while at least this many calls
/// remain in the rate-limit window; the limiter blocks otherwise.
const METADATA_FLOOR: u64 = 50;
const COMMITS_START_FLOOR: u64 = 100;
const COMMITS_PAGE_FLOOR: u64 = 25;
const LIST_PAGE_FLOOR: u64 = 50;
const ITEM_FLOOR: u64 = 25;

/// GitHub stops serving stargazer pages past the 40000th star.
const STARGAZER_PAGE_CAP: u32 = 400;

/// Media type that makes the stargazers endpoint include `starred_at`.
const STAR_MEDIA_TYPE: &str = "application/vnd.github.star+json";

/// Fetches one feature of one repository and persists it as a CSV file.
///
/// Every fetch is skipped when its output file already exists, so an
/// interrupted run resumes where it left off. Output is written once, after
/// the full collection has been paged in.
#[derive(Debug)]
pub struct FeatureFetcher {
    client: Client,
    limiter: RateLimiter,
    store: CollectionStore,
}

impl FeatureFetcher {
    #[must_use]
    pub fn new(client: Client, store: CollectionStore) -> Self {
        let limiter = RateLimiter::new(client.clone());
        Self { client, limiter, store }
    }

    pub async fn fetch(&self, repo: &RepoId, feature: Feature) -> Result<()> {
        match feature {
            Feature::RepoData => self.fetch_repo_data(repo).await,
            Feature::Commits => self.fetch_commits(repo).await,
            Feature::IssuesPulls => self.fetch_issues_pulls(repo).await,
            Feature::Forks => self.fetch_forks(repo).await,
            Feature::Stargazer => self.fetch_stargazers(repo).await,
            Feature::Watchers => self.fetch_watchers(repo).await,
            Feature::Contributors => self.fetch_contributors(repo).await,
        }
    }

    /// Returns the output path when the feature still needs fetching, or
    /// `None` when an earlier run already produced it.
    fn needs_fetch(&self, repo: &RepoId, feature: Feature) -> Option<PathBuf> {
        let (exists, path) = self.store.feature_status(repo, feature);
        if exists {
            log::info!(target: LOG_TARGET, "Skipping {feature} for '{repo}': '{}' already exists", path.display());
            None
        } else {
            Some(path)
        }
    }

    async fn fetch_repo_data(&self, repo: &RepoId) -> Result<()> {
        let Some(path) = self.needs_fetch(repo, Feature::RepoData) else {
            return Ok(());
        };

        log::info!(target: LOG_TARGET, "Fetching repository metadata for '{repo}'");
        self.limiter.check(METADATA_FLOOR).await;

        let data = self.client.get_repo(repo).await?;

        let branches_count = self.client.count_collection(repo, "branches").await?;
        let milestones_count = self.client.count_collection(repo, "milestones?state=all").await?;
        let pulls_count = self.client.count_collection(repo, "pulls?state=all").await?;
        let releases_count = self.client.count_collection(repo, "releases").await?;
        let workflows_count = self.client.workflow_count(repo).await?;

        let record = RepoDataRecord {
            repo_name: data.full_name.unwrap_or_else(|| repo.path()),
            description: data.description,
            language: data.language.as_ref().and_then(|l| l.as_str()).map(str::to_string),
            owner: data.owner.map(|o| o.login),
            created_at: data.created_at,
            pushed_at: data.pushed_at,
            updated_at: data.updated_at,
            stargazers_count: u64::from(data.stargazers_count.unwrap_or(0)),
            branches_count,
            milestones_count,
            pulls_count,
            releases_count,
            workflows_count,
            open_issues_count: u64::from(data.open_issues_count.unwrap_or(0)),
            watchers_count: u64::from(data.watchers_count.unwrap_or(0)),
            subscribers_count: data.subscribers_count.filter(|&count| count >= 0).map_or(0, i64::cast_unsigned),
            has_issues: data.has_issues.unwrap_or(false),
            has_projects: data.has_projects.unwrap_or(false),
            has_wiki: data.has_wiki.unwrap_or(false),
            has_pages: data.has_pages.unwrap_or(false),
            has_downloads: data.has_downloads.unwrap_or(false),
            archived: data.archived.unwrap_or(false),
            is_fork: data.fork.unwrap_or(false),
        };

        write_records(&path, &[record])?;
        log::info!(target: LOG_TARGET, "Wrote repository metadata to '{}'", path.display());
        Ok(())
    }

    async fn fetch_commits(&self, repo: &RepoId) -> Result<()> {
        let Some(path) = self.needs_fetch(repo, Feature::Commits) else {
            return Ok(());
        };

        log::info!(target: LOG_TARGET, "Fetching commits for '{repo}'");
        self.limiter.check(COMMITS_START_FLOOR).await;

        let commit_count = self.client.count_collection(repo, "commits").await?;

        let mut records = Vec::new();
        let mut page = 1;
        loop {
            self.limiter.check(COMMITS_PAGE_FLOOR).await;

            let commits: Vec<CommitInfo> = self.client.list_page(repo, "commits", page, None).await?;
            let page_len = commits.len();

            records.extend(commits.into_iter().filter_map(|commit| {
                commit.date().map(|commit_date| CommitRecord {
                    repo_name: repo.path(),
                    commit_count,
                    commit_id: commit.sha,
                    commit_date,
                })
            }));

            if page_len < PER_PAGE as usize {
                break;
            }
            page += 1;
        }

        write_records(&path, &records)?;
        log::info!(target: LOG_TARGET, "Wrote {} commit records to '{}'", records.len(), path.display());
        Ok(())
    }

    async fn fetch_issues_pulls(&self, repo: &RepoId) -> Result<()> {
        let Some(path) = self.needs_fetch(repo, Feature::IssuesPulls) else {
            return Ok(());
        };

        log::info!(target: LOG_TARGET, "Fetching issues and pull requests for '{repo}'");
        self.limiter.check(LIST_PAGE_FLOOR).await;

        let mut page = self.client.first_issue_page(repo).await?;
        let mut all_issues = page.take_items();

        while page.next.is_some() {
            self.limiter.check(LIST_PAGE_FLOOR).await;

            let Some(mut next_page) = self.client.next_issue_page(&page).await? else {
                break;
            };
            all_issues.append(&mut next_page.take_items());
            page = next_page;
        }

        let records: Vec<_> = all_issues
            .into_iter()
            .map(|issue| IssuePullRecord {
                pr_iss_type: if issue.pull_request.is_some() {
                    "pull request".to_string()
                } else {
                    "Issue".to_string()
                },
                state: match issue.state {
                    IssueState::Open => "open".to_string(),
                    IssueState::Closed => "closed".to_string(),
                    _ => "other".to_string(),
                },
                pr_iss_opened_at: issue.created_at,
                pr_iss_updated_at: issue.updated_at,
                pr_iss_closed_at: issue.closed_at,
            })
            .collect();

        write_records(&path, &records)?;
        log::info!(target: LOG_TARGET, "Wrote {} issue/pull records to '{}'", records.len(), path.display());
        Ok(())
    }

    async fn fetch_forks(&self, repo: &RepoId) -> Result<()> {
        let Some(path) = self.needs_fetch(repo, Feature::Forks) else {
            return Ok(());
        };

        log::info!(target: LOG_TARGET, "Fetching forks for '{repo}'");
        self.limiter.check(METADATA_FLOOR).await;

        let data = self.client.get_repo(repo).await?;
        let forks_count = u64::from(data.forks_count.unwrap_or(0));

        let mut records = Vec::new();
        let mut page = 1;
        loop {
            self.limiter.check(LIST_PAGE_FLOOR).await;

            let forks: Vec<Fork> = self.client.list_page(repo, "forks", page, None).await?;
            let page_len = forks.len();

            records.extend(forks.into_iter().map(|fork| ForkRecord {
                repo_name: repo.path(),
                forks_count,
                forked_by: fork.owner.map_or(fork.full_name, |owner| owner.login),
                forked_at: fork.created_at,
            }));

            if page_len < PER_PAGE as usize {
                break;
            }
            page += 1;
        }

        write_records(&path, &records)?;
        log::info!(target: LOG_TARGET, "Wrote {} fork records to '{}'", records.len(), path.display());
        Ok(())
    }

    async fn fetch_stargazers(&self, repo: &RepoId) -> Result<()> {
        let Some(path) = self.needs_fetch(repo, Feature::Stargazer) else {
            return Ok(());
        };

        log::info!(target: LOG_TARGET, "Fetching stargazers for '{repo}'");
        self.limiter.check(METADATA_FLOOR).await;

        let data = self.client.get_repo(repo).await?;
        let reported = u64::from(data.stargazers_count.unwrap_or(0));

        let mut records = Vec::new();
        let mut page = 1;
        loop {
            self.limiter.check(LIST_PAGE_FLOOR).await;

            let stars: Vec<Stargazer> = self.client.list_page(repo, "stargazers", page, Some(STAR_MEDIA_TYPE)).await?;
            let page_len = stars.len();

            records.extend(stars.into_iter().filter_map(|star| {
                star.user.map(|user| StargazerRecord {
                    starred_by: user.login,
                    starred_at: star.starred_at,
                })
            }));

            // The API refuses to page past the cap, so stop short of the 422.
            if page_len < PER_PAGE as usize || page >= STARGAZER_PAGE_CAP {
                break;
            }
            page += 1;
        }

        if let Some((got, expected)) = stargazer_shortfall(reported, records.len() as u64) {
            log::warn!(
                target: LOG_TARGET,
                "Stargazer history for '{repo}' is truncated: retrieved {got} of {expected} stars (the API caps the listing)"
            );
        }

        write_records(&path, &records)?;
        log::info!(target: LOG_TARGET, "Wrote {} stargazer records to '{}'", records.len(), path.display());
        Ok(())
    }

    async fn fetch_watchers(&self, repo: &RepoId) -> Result<()> {
        let Some(path) = self.needs_fetch(repo, Feature::Watchers) else {
            return Ok(());
        };

        log::info!(target: LOG_TARGET, "Fetching watchers for '{repo}'");
        self.limiter.check(METADATA_FLOOR).await;

        let data = self.client.get_repo(repo).await?;
        let watchers_count = u64::from(data.watchers_count.unwrap_or(0));
        let subscribers_count = data.subscribers_count.filter(|&count| count >= 0).map_or(0, i64::cast_unsigned);

        let mut records = Vec::new();
        let mut page = 1;
        loop {
            self.limiter.check(LIST_PAGE_FLOOR).await;

            let subscribers: Vec<UserRef> = self.client.list_page(repo, "subscribers", page, None).await?;
            let page_len = subscribers.len();

            for subscriber in subscribers {
                self.limiter.check(ITEM_FLOOR).await;

                // Best effort. A deleted or hidden account should not sink
                // the whole feature.
                let subscribed_at = match self.client.get_user(&subscriber.login).await {
                    Ok(profile) => profile.created_at,
                    Err(e) => {
                        log::warn!(target: LOG_TARGET, "Could not resolve profile for subscriber '{}': {e:#}", subscriber.login);
                        None
                    }
                };

                records.push(WatcherRecord {
                    watchers_count,
                    subscribers_count,
                    subscriber: subscriber.login,
                    subscribed_at,
                });
            }

            if page_len < PER_PAGE as usize {
                break;
            }
            page += 1;
        }

        write_records(&path, &records)?;
        log::info!(target: LOG_TARGET, "Wrote {} watcher records to '{}'", records.len(), path.display());
        Ok(())
    }

    async fn fetch_contributors(&self, repo: &RepoId) -> Result<()> {
        let Some(path) = self.needs_fetch(repo, Feature::Contributors) else {
            return Ok(());
        };

        log::info!(target: LOG_TARGET, "Fetching contributors for '{repo}'");
        self.limiter.check(METADATA_FLOOR).await;

        let mut named = Vec::new();
        let mut page = 1;
        loop {
            self.limiter.check(LIST_PAGE_FLOOR).await;

            let contributors: Vec<Contributor> = self.client.list_page(repo, "contributors", page, None).await?;
            let page_len = contributors.len();

            named.extend(contributors.into_iter().filter_map(|c| c.login));

            if page_len < PER_PAGE as usize {
                break;
            }
            page += 1;
        }

        let contributors_count = named.len() as u64;

        match self.client.count_collection(repo, "contributors?anon=true").await {
            Ok(total) => {
                log::info!(target: LOG_TARGET, "'{repo}' has {contributors_count} named contributors ({total} including anonymous)");
            }
            Err(e) => log::warn!(target: LOG_TARGET, "Could not count anonymous contributors for '{repo}': {e:#}"),
        }

        let mut records = Vec::with_capacity(named.len());
        for login in named {
            self.limiter.check(ITEM_FLOOR).await;

            let contributor_created_at = match self.client.get_user(&login).await {
                Ok(profile) => profile.created_at,
                Err(e) => {
                    log::warn!(target: LOG_TARGET, "Could not resolve profile for contributor '{login}': {e:#}");
                    None
                }
            };

            records.push(ContributorRecord {
                contributor: login,
                contributor_created_at,
                contributors_count,
            });
        }

        write_records(&path, &records)?;
        log::info!(target: LOG_TARGET, "Wrote {} contributor records to '{}'", records.len(), path.display());
        Ok(())
    }
}

/// When the retrieved stargazer rows fall short of the repository's
/// reported star count, returns `(retrieved, reported)` for the warning.
#[must_use]
fn stargazer_shortfall(reported: u64, retrieved: u64) -> Option<(u64, u64)> {
    (retrieved < reported).then_some((retrieved, reported))
}
