use crate::Result;
use crate::fetch::Feature;
use crate::fetch::fetcher::FeatureFetcher;
use crate::fetch::store::CollectionStore;
use crate::github::{Client, RepoId};

const LOG_TARGET: &str = "orchestrtr";

/// Drives the full per-repository fetch sequence, one feature at a time.
///
/// A failed feature is logged and the sequence moves on; the features are
/// independent files and one flaky endpoint should not cost the rest of a
/// long run. The failure count is reported so callers can decide whether
/// the run as a whole succeeded.
#[derive(Debug)]
pub struct Orchestrator {
    fetcher: FeatureFetcher,
    store: CollectionStore,
}

impl Orchestrator {
    #[must_use]
    pub fn new(client: Client, store: CollectionStore) -> Self {
        let fetcher = FeatureFetcher::new(client, store.clone());
        Self { fetcher, store }
    }

    /// Fetch every feature of one repository. Returns the number of
    /// features that failed.
    pub async fn fetch_all(&self, repo: &RepoId) -> Result<u32> {
        log::info!(target: LOG_TARGET, "Collecting '{repo}'");

        let _ = self.store.ensure_repo_dir(repo)?;

        let mut failures = 0;
        for feature in Feature::FETCH_ORDER {
            if let Err(e) = self.fetcher.fetch(repo, feature).await {
                log::error!(target: LOG_TARGET, "Failed to fetch {feature} for '{repo}': {e:#}");
                failures += 1;
            }
        }

        if failures == 0 {
            log::info!(target: LOG_TARGET, "Finished collecting '{repo}'");
        } else {
            log::warn!(target: LOG_TARGET, "Finished collecting '{repo}' with {failures} failed feature(s)");
        }

        Ok(failures)
    }
}
