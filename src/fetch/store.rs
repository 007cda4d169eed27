use crate::Result;
use crate::config::Features;
use crate::fetch::Feature;
use crate::github::RepoId;
use ohno::{IntoAppError, bail};
use std::fs;
use std::path::{Path, PathBuf};

const LOG_TARGET: &str = "     store";

/// Owns the on-disk layout of the raw collection: one directory per
/// repository under a common root, one CSV file per feature inside it.
#[derive(Debug, Clone)]
pub struct CollectionStore {
    root: PathBuf,
    files: Features,
}

impl CollectionStore {
    #[must_use]
    pub fn new(root: PathBuf, files: Features) -> Self {
        Self { root, files }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the collection root, including any grouping layer, if it does
    /// not exist yet.
    pub fn ensure_root(&self) -> Result<()> {
        fs::create_dir_all(&self.root).into_app_err_with(|| format!("unable to create data directory '{}'", self.root.display()))?;
        Ok(())
    }

    /// Create the directory for one repository. Safe to call on every run;
    /// an existing directory is left alone.
    pub fn ensure_repo_dir(&self, repo: &RepoId) -> Result<PathBuf> {
        let dir = self.root.join(repo.short_name());

        if dir.is_dir() {
            log::debug!(target: LOG_TARGET, "Directory '{}' already exists", dir.display());
        } else {
            fs::create_dir_all(&dir).into_app_err_with(|| format!("unable to create repository directory '{}'", dir.display()))?;
            log::info!(target: LOG_TARGET, "Created directory '{}'", dir.display());
        }

        Ok(dir)
    }

    /// The CSV path for one feature of one repository.
    #[must_use]
    pub fn feature_path(&self, repo: &RepoId, feature: Feature) -> PathBuf {
        self.root.join(repo.short_name()).join(format!("{}.csv", self.files.stem(feature)))
    }

    /// Whether the feature file already exists, plus its path. An existing
    /// file means the feature was collected by an earlier run and is
    /// skipped, which is what makes re-running after a failure cheap.
    #[must_use]
    pub fn feature_status(&self, repo: &RepoId, feature: Feature) -> (bool, PathBuf) {
        let path = self.feature_path(repo, feature);
        (path.is_file(), path)
    }
}

/// Resolve and sanity-check a pipeline input directory. A missing or empty
/// directory means the preceding stage never ran, which is fatal.
pub fn repos_root(path: &Path) -> Result<PathBuf> {
    if !path.is_dir() {
        bail!("Path does not exist: '{}'. Run the preceding pipeline stage first.", path.display());
    }

    let mut entries = fs::read_dir(path).into_app_err_with(|| format!("unable to read directory '{}'", path.display()))?;
    if entries.next().is_none() {
        bail!("Directory '{}' is empty. Run the preceding pipeline stage first.", path.display());
    }

    Ok(path.to_path_buf())
}

/// Find the repository directories under a raw-data root.
///
/// The root may hold repository directories directly, or one level of
/// grouping directories (e.g. per organization) whose children are the
/// repository directories. A subdirectory counts as a grouping layer when
/// it has subdirectories of its own; otherwise it is a repository leaf.
pub fn discover_repo_dirs(root: &Path) -> Result<Vec<PathBuf>> {
    let mut repo_dirs = Vec::new();

    for entry in fs::read_dir(root).into_app_err_with(|| format!("unable to read directory '{}'", root.display()))? {
        let entry = entry.into_app_err_with(|| format!("unable to read directory '{}'", root.display()))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }

        let children = subdirectories(&path)?;
        if children.is_empty() {
            repo_dirs.push(path);
        } else {
            repo_dirs.extend(children);
        }
    }

    repo_dirs.sort();

    log::debug!(target: LOG_TARGET, "Discovered {} repository directories under '{}'", repo_dirs.len(), root.display());

    Ok(repo_dirs)
}

fn subdirectories(path: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();

    for entry in fs::read_dir(path).into_app_err_with(|| format!("unable to read directory '{}'", path.display()))? {
        let entry = entry.into_app_err_with(|| format!("unable to read directory '{}'", path.display()))?;
        let child = entry.path();
        if child.is_dir() {
            dirs.push(child);
        }
    }

    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::str::FromStr;

    fn temp_root(name: &str) -> PathBuf {
        let root = env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&root);
        root
    }

    #[test]
    fn test_feature_paths() {
        let store = CollectionStore::new(PathBuf::from("/data/raw/org"), Features::default());
        let repo = RepoId::from_str("octocat/hello-world").unwrap();

        let (exists, path) = store.feature_status(&repo, Feature::Forks);
        assert!(!exists);
        assert_eq!(path, PathBuf::from("/data/raw/org/hello-world/forks.csv"));
        assert_eq!(store.feature_path(&repo, Feature::RepoData), PathBuf::from("/data/raw/org/hello-world/repo_data.csv"));
    }

    #[test]
    fn test_ensure_repo_dir_is_idempotent() {
        let root = temp_root("repo_pulse_test_store_idempotent");
        let store = CollectionStore::new(root.clone(), Features::default());
        let repo = RepoId::from_str("octocat/hello").unwrap();

        store.ensure_root().unwrap();
        let first = store.ensure_repo_dir(&repo).unwrap();
        let second = store.ensure_repo_dir(&repo).unwrap();
        assert_eq!(first, second);
        assert!(first.is_dir());

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_feature_status_gates_refetch() {
        let root = temp_root("repo_pulse_test_store_status");
        let store = CollectionStore::new(root.clone(), Features::default());
        let repo = RepoId::from_str("octocat/hello").unwrap();

        let dir = store.ensure_repo_dir(&repo).unwrap();
        let (exists, path) = store.feature_status(&repo, Feature::Commits);
        assert!(!exists);

        fs::write(&path, "repo_name,commit_count,commit_id,commit_date\n").unwrap();
        let (exists, _) = store.feature_status(&repo, Feature::Commits);
        assert!(exists);
        assert!(dir.is_dir());

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_discover_flattens_one_grouping_level() {
        let root = temp_root("repo_pulse_test_store_discover");
        fs::create_dir_all(root.join("org1/repo_a")).unwrap();
        fs::create_dir_all(root.join("org1/repo_b")).unwrap();
        fs::create_dir_all(root.join("repo_c")).unwrap();

        let dirs = discover_repo_dirs(&root).unwrap();
        assert_eq!(dirs.len(), 3);
        assert!(dirs.contains(&root.join("org1/repo_a")));
        assert!(dirs.contains(&root.join("org1/repo_b")));
        assert!(dirs.contains(&root.join("repo_c")));

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_repos_root_rejects_missing_directory() {
        let result = repos_root(Path::new("/nonexistent/raw/data"));
        assert!(result.unwrap_err().to_string().contains("does not exist"));
    }

    #[test]
    fn test_repos_root_rejects_empty_directory() {
        let root = temp_root("repo_pulse_test_store_empty");
        fs::create_dir_all(&root).unwrap();

        let result = repos_root(&root);
        assert!(result.unwrap_err().to_string().contains("is empty"));

        let _ = fs::remove_dir_all(&root);
    }
}
