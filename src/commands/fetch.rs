use crate::commands::common::{Common, CommonArgs};
use clap::Parser;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use ohno::bail;
use repo_pulse::Result;
use repo_pulse::fetch::{CollectionStore, Orchestrator};
use repo_pulse::github::{Client, RepoId};

const PROGRESS_TEMPLATE: &str = "{prefix:>12.bold.cyan} [{bar:25}] {pos}/{len} {msg}";

#[derive(Parser, Debug)]
pub struct FetchArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// GitHub personal access token
    #[arg(long, value_name = "TOKEN", env = "GITHUB_TOKEN")]
    pub github_token: Option<String>,

    /// Repository to fetch, as "owner/name"; may be repeated [default: the configured list]
    #[arg(long = "repo", value_name = "OWNER/NAME")]
    pub repos: Vec<String>,
}

/// Command-line repositories win over the configured list; both are parsed
/// here so a malformed entry is rejected before any network work starts.
fn resolve_repos(from_args: &[String], from_config: &[String]) -> Result<Vec<RepoId>> {
    let chosen = if from_args.is_empty() { from_config } else { from_args };

    let repos: Vec<RepoId> = chosen.iter().map(|s| s.parse()).collect::<Result<_>>()?;

    if repos.is_empty() {
        bail!("no repositories to fetch; configure 'repos.fetch' or pass --repo");
    }

    Ok(repos)
}

pub async fn fetch_repos(args: &FetchArgs) -> Result<()> {
    let common = Common::new(&args.common)?;

    let repos = resolve_repos(&args.repos, &common.config.repos.fetch)?;

    let client = Client::authenticate(args.github_token.as_deref()).await?;

    let store = CollectionStore::new(common.config.raw_root(), common.config.features.clone());
    store.ensure_root()?;

    let orchestrator = Orchestrator::new(client, store);

    let bar = ProgressBar::new(repos.len() as u64);
    if common.show_progress() {
        bar.set_style(
            ProgressStyle::default_bar()
                .template(PROGRESS_TEMPLATE)
                .expect("could not create progress bar style")
                .progress_chars("=> "),
        );
        bar.set_prefix("Fetching");
    } else {
        bar.set_draw_target(ProgressDrawTarget::hidden());
    }

    let mut failed_features = 0;
    for repo in &repos {
        bar.set_message(repo.path());
        failed_features += orchestrator.fetch_all(repo).await?;
        bar.inc(1);
    }
    bar.finish_and_clear();

    if failed_features > 0 {
        bail!("{failed_features} feature(s) failed to fetch; re-run to retry just those");
    }

    println!("Fetched {} repositories into '{}'", repos.len(), common.config.raw_root().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_repos_prefers_command_line() {
        let from_args = vec!["rust-lang/rust".to_string()];
        let from_config = vec!["tokio-rs/tokio".to_string()];

        let repos = resolve_repos(&from_args, &from_config).unwrap();
        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].path(), "rust-lang/rust");
    }

    #[test]
    fn test_resolve_repos_falls_back_to_config() {
        let repos = resolve_repos(&[], &["tokio-rs/tokio".to_string()]).unwrap();
        assert_eq!(repos[0].path(), "tokio-rs/tokio");
    }

    #[test]
    fn test_resolve_repos_rejects_malformed_and_empty() {
        assert!(resolve_repos(&["not-a-repo".to_string()], &[]).is_err());
        assert!(resolve_repos(&[], &[]).is_err());
    }
}
