use crate::Result;
use crate::fetch::Feature;
use camino::{Utf8Path, Utf8PathBuf};
use ohno::{IntoAppError, app_err};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::PathBuf;

/// The default configuration YAML content, embedded from `default_config.yml`
pub const DEFAULT_CONFIG_YAML: &str = include_str!("../../default_config.yml");

/// Output locations for the pipeline stages.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Paths {
    #[serde(default = "default_log_dir")]
    pub log: Utf8PathBuf,

    #[serde(default = "default_raw_data_dir")]
    pub raw_data: Utf8PathBuf,

    #[serde(default = "default_processed_data_dir")]
    pub processed_data: Utf8PathBuf,

    #[serde(default = "default_final_data_dir")]
    pub final_data: Utf8PathBuf,
}

fn default_log_dir() -> Utf8PathBuf {
    Utf8PathBuf::from("logs")
}

fn default_raw_data_dir() -> Utf8PathBuf {
    Utf8PathBuf::from("data/raw")
}

fn default_processed_data_dir() -> Utf8PathBuf {
    Utf8PathBuf::from("data/processed")
}

fn default_final_data_dir() -> Utf8PathBuf {
    Utf8PathBuf::from("data/final")
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            log: default_log_dir(),
            raw_data: default_raw_data_dir(),
            processed_data: default_processed_data_dir(),
            final_data: default_final_data_dir(),
        }
    }
}

/// Output file names.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Files {
    /// Name of the final cross-repository data file.
    #[serde(rename = "final", default = "default_final_file")]
    pub final_file: String,
}

fn default_final_file() -> String {
    "all_repos_data.csv".to_string()
}

impl Default for Files {
    fn default() -> Self {
        Self {
            final_file: default_final_file(),
        }
    }
}

/// Training-style parameters carried for downstream consumers of the final
/// data set. The collection pipeline itself does not use them.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Params {
    #[serde(default = "default_epoch")]
    pub epoch: u32,

    #[serde(default = "default_lr")]
    pub lr: f64,

    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
}

const fn default_epoch() -> u32 {
    10
}

const fn default_lr() -> f64 {
    0.001
}

const fn default_batch_size() -> u32 {
    32
}

impl Default for Params {
    fn default() -> Self {
        Self {
            epoch: default_epoch(),
            lr: default_lr(),
            batch_size: default_batch_size(),
        }
    }
}

/// File stems for the per-feature CSV files.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Features {
    #[serde(default = "default_repo_data_stem")]
    pub repo_data: String,

    #[serde(default = "default_commits_stem")]
    pub commits: String,

    #[serde(default = "default_issues_pulls_stem")]
    pub issues_pulls: String,

    #[serde(default = "default_forks_stem")]
    pub forks: String,

    #[serde(default = "default_stargazer_stem")]
    pub stargazer: String,

    #[serde(default = "default_contributors_stem")]
    pub contributors: String,

    #[serde(default = "default_watchers_stem")]
    pub watchers: String,
}

fn default_repo_data_stem() -> String {
    "repo_data".to_string()
}

fn default_commits_stem() -> String {
    "commits".to_string()
}

fn default_issues_pulls_stem() -> String {
    "issues_pulls".to_string()
}

fn default_forks_stem() -> String {
    "forks".to_string()
}

fn default_stargazer_stem() -> String {
    "stargazer".to_string()
}

fn default_contributors_stem() -> String {
    "contributors".to_string()
}

fn default_watchers_stem() -> String {
    "watchers".to_string()
}

impl Default for Features {
    fn default() -> Self {
        Self {
            repo_data: default_repo_data_stem(),
            commits: default_commits_stem(),
            issues_pulls: default_issues_pulls_stem(),
            forks: default_forks_stem(),
            stargazer: default_stargazer_stem(),
            contributors: default_contributors_stem(),
            watchers: default_watchers_stem(),
        }
    }
}

impl Features {
    /// The configured file stem for a feature.
    #[must_use]
    pub fn stem(&self, feature: Feature) -> &str {
        match feature {
            Feature::RepoData => &self.repo_data,
            Feature::Commits => &self.commits,
            Feature::IssuesPulls => &self.issues_pulls,
            Feature::Forks => &self.forks,
            Feature::Stargazer => &self.stargazer,
            Feature::Contributors => &self.contributors,
            Feature::Watchers => &self.watchers,
        }
    }
}

/// The repositories to fetch and where their raw data lands.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Repos {
    /// Optional grouping directory (e.g. an organization name) inserted
    /// between the raw-data root and the individual repository directories.
    #[serde(default)]
    pub dir: String,

    /// Repositories to fetch, as "owner/name".
    #[serde(default)]
    pub fetch: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub paths: Paths,

    #[serde(default)]
    pub files: Files,

    #[serde(default)]
    pub params: Params,

    #[serde(default)]
    pub features: Features,

    #[serde(default)]
    pub repos: Repos,
}

impl Config {
    /// Load configuration from a file or use defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn load(config_path: Option<&Utf8PathBuf>) -> Result<(Self, Vec<String>)> {
        let (final_path, text) = if let Some(path) = config_path {
            let text = fs::read_to_string(path).into_app_err_with(|| format!("reading repo-pulse configuration from {path}"))?;
            (path.clone(), text)
        } else {
            let candidates = [
                Utf8PathBuf::from("repo-pulse.toml"),
                Utf8PathBuf::from("repo-pulse.yml"),
                Utf8PathBuf::from("repo-pulse.yaml"),
                Utf8PathBuf::from("repo-pulse.json"),
            ];

            let mut found = None;
            for path in &candidates {
                match fs::read_to_string(path) {
                    Ok(text) => {
                        found = Some((path.clone(), text));
                        break;
                    }
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e).into_app_err_with(|| format!("reading repo-pulse configuration from {path}")),
                }
            }

            let Some(result) = found else {
                let config: Self =
                    serde_yaml::from_str(DEFAULT_CONFIG_YAML).into_app_err("parsing embedded default configuration")?;
                let mut warnings = Vec::new();
                config.validate(&mut warnings);
                return Ok((config, warnings));
            };
            result
        };

        let extension = final_path.extension().unwrap_or_default();
        let config: Self = match extension {
            "toml" => toml::from_str(&text).into_app_err_with(|| format!("parsing TOML configuration from {final_path}"))?,
            "yml" | "yaml" => serde_yaml::from_str(&text).into_app_err_with(|| format!("parsing YAML configuration from {final_path}"))?,
            "json" => serde_json::from_str(&text).into_app_err_with(|| format!("parsing JSON configuration from {final_path}"))?,
            _ => return Err(app_err!("unsupported configuration file extension: {extension}")),
        };

        let mut warnings = Vec::new();
        config.validate(&mut warnings);
        Ok((config, warnings))
    }

    /// Save configuration to a file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or serialization fails
    pub fn save(&self, output_path: &Utf8Path) -> Result<()> {
        let extension = output_path.extension().unwrap_or_default();
        let text = match extension {
            "toml" => toml::to_string_pretty(self).into_app_err_with(|| format!("serializing configuration to TOML for {output_path}"))?,
            "yml" | "yaml" => serde_yaml::to_string(self).into_app_err_with(|| format!("serializing configuration to YAML for {output_path}"))?,
            "json" => serde_json::to_string_pretty(self).into_app_err_with(|| format!("serializing configuration to JSON for {output_path}"))?,
            _ => return Err(app_err!("unsupported configuration file extension: {extension}")),
        };

        fs::write(output_path, text).into_app_err_with(|| format!("writing configuration to {output_path}"))?;
        Ok(())
    }

    /// The directory raw feature files are written into. The optional
    /// grouping directory from `repos.dir` is inserted when configured.
    #[must_use]
    pub fn raw_root(&self) -> PathBuf {
        if self.repos.dir.is_empty() {
            self.paths.raw_data.as_std_path().to_path_buf()
        } else {
            self.paths.raw_data.as_std_path().join(&self.repos.dir)
        }
    }

    fn validate(&self, warnings: &mut Vec<String>) {
        if self.repos.fetch.is_empty() {
            warnings.push("no repositories configured under 'repos.fetch'; 'fetch' will only work with --repo".to_string());
        }

        for repo in &self.repos.fetch {
            if repo.split('/').filter(|s| !s.is_empty()).count() != 2 {
                warnings.push(format!("repository '{repo}' is not in 'owner/name' form"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses() {
        let config: Config = serde_yaml::from_str(DEFAULT_CONFIG_YAML).unwrap();
        assert_eq!(config.paths.raw_data, "data/raw");
        assert_eq!(config.files.final_file, "all_repos_data.csv");
        assert_eq!(config.features.repo_data, "repo_data");
        assert!(config.repos.fetch.is_empty());
    }

    #[test]
    fn test_feature_stems() {
        let features = Features::default();
        assert_eq!(features.stem(Feature::RepoData), "repo_data");
        assert_eq!(features.stem(Feature::IssuesPulls), "issues_pulls");
        assert_eq!(features.stem(Feature::Stargazer), "stargazer");
    }

    #[test]
    fn test_raw_root_grouping_layer() {
        let mut config = Config::default();
        assert_eq!(config.raw_root(), PathBuf::from("data/raw"));

        config.repos.dir = "my-org".to_string();
        assert_eq!(config.raw_root(), PathBuf::from("data/raw/my-org"));
    }

    #[test]
    fn test_validate_flags_malformed_repo() {
        let mut config = Config::default();
        config.repos.fetch = vec!["owner/name".to_string(), "not-a-repo".to_string()];

        let mut warnings = Vec::new();
        config.validate(&mut warnings);
        assert!(warnings.iter().any(|w| w.contains("not-a-repo")));
    }
}
