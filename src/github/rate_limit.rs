use crate::github::client::Client;
use chrono::{DateTime, Utc};
use core::time::Duration;

const LOG_TARGET: &str = "rate_limit";

/// The hourly request ceiling GitHub grants authenticated sessions.
pub const AUTHENTICATED_CEILING: u64 = 5000;

/// A snapshot of the remote rate-limit quota, produced by querying the API.
///
/// `remaining` is only trustworthy for throttling decisions when `limit` is
/// the authenticated ceiling; unauthenticated sessions report a different
/// ceiling and are assumed to be short-lived manual runs.
#[derive(Debug, Clone, Copy)]
pub struct RateBudget {
    pub remaining: u64,
    pub limit: u64,
    pub reset_at: DateTime<Utc>,
}

/// Decide how long to block before the next fetch step, given the current
/// budget. Returns `None` when no wait is needed: the session is
/// unauthenticated, the floor is not breached, or the window already reset.
/// A wait is the time until `reset_at`, rounded up to whole minutes.
#[must_use]
pub fn wait_duration(budget: &RateBudget, min_remaining: u64, now: DateTime<Utc>) -> Option<Duration> {
    if budget.limit != AUTHENTICATED_CEILING {
        return None;
    }

    if budget.remaining >= min_remaining {
        return None;
    }

    let seconds = budget.reset_at.signed_duration_since(now).num_seconds();
    if seconds <= 0 {
        return None;
    }

    let minutes = seconds.unsigned_abs().div_ceil(60);
    Some(Duration::from_secs(minutes * 60))
}

/// Blocks the pipeline whenever the shared rate-limit budget drops below a
/// caller-supplied floor. One limiter is shared by every feature fetch; the
/// wait halts the whole pipeline, which is fine because the remote API is
/// the sole bottleneck resource.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    client: Client,
}

impl RateLimiter {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Query the current budget and block until the window resets if fewer
    /// than `min_remaining` calls are left.
    ///
    /// A failure to query the budget is reported and treated as "no wait"
    /// so a transient API hiccup cannot abort a multi-hour fetch run.
    pub async fn check(&self, min_remaining: u64) {
        let budget = match self.client.rate_budget().await {
            Ok(budget) => budget,
            Err(e) => {
                log::warn!(target: LOG_TARGET, "Could not query the rate limit budget, proceeding without waiting: {e:#}");
                return;
            }
        };

        let Some(wait) = wait_duration(&budget, min_remaining, Utc::now()) else {
            return;
        };

        let total_minutes = wait.as_secs() / 60;
        log::info!(
            target: LOG_TARGET,
            "Rate limit budget low ({} of {} calls remaining): waiting {total_minutes} minute(s) until the window resets at {}",
            budget.remaining,
            budget.limit,
            budget.reset_at
        );

        for minutes_left in (1..=total_minutes).rev() {
            tokio::time::sleep(Duration::from_secs(60)).await;
            if minutes_left > 1 {
                log::info!(target: LOG_TARGET, "Still waiting on the rate limit window: {} minute(s) left", minutes_left - 1);
            }
        }

        log::info!(target: LOG_TARGET, "Rate limit window reset, resuming");
    }
}
