mod client;
mod models;
mod rate_limit;
mod repo_id;

pub use client::{Client, PER_PAGE};
pub use models::{CommitInfo, Contributor, Fork, Stargazer, UserProfile, UserRef, WorkflowList};
pub use rate_limit::{AUTHENTICATED_CEILING, RateBudget, RateLimiter, wait_duration};
pub use repo_id::RepoId;
