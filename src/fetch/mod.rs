mod feature;
mod fetcher;
mod orchestrator;
mod records;
mod store;

pub use feature::Feature;
pub use fetcher::FeatureFetcher;
pub use orchestrator::Orchestrator;
pub use records::{
    CommitRecord, ContributorRecord, ForkRecord, IssuePullRecord, RepoDataRecord, StargazerRecord, WatcherRecord, read_records,
    write_records,
};
pub use store::{CollectionStore, discover_repo_dirs, repos_root};
