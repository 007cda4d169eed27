use crate::Result;
use core::fmt::{Display, Formatter};
use core::str::FromStr;
use ohno::bail;

/// A repository identifier in "owner/name" form.
///
/// The name segment doubles as the local directory name for the
/// repository's raw data.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoId {
    owner: Box<str>,
    name: Box<str>,
}

impl RepoId {
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The last path segment, used as the local directory name.
    #[must_use]
    pub fn short_name(&self) -> &str {
        &self.name
    }

    /// The "owner/name" path fragment for API URLs.
    #[must_use]
    pub fn path(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepoId {
    type Err = ohno::AppError;

    fn from_str(s: &str) -> Result<Self> {
        let mut segments = s.split('/');
        let (Some(owner), Some(name), None) = (segments.next(), segments.next(), segments.next()) else {
            bail!("invalid repository identifier '{s}': expected 'owner/name'");
        };

        if owner.is_empty() || name.is_empty() {
            bail!("invalid repository identifier '{s}': empty owner or repository name");
        }

        Ok(Self {
            owner: Box::from(owner),
            name: Box::from(name.trim_end_matches(".git")),
        })
    }
}

impl Display for RepoId {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_owner_name() {
        let id: RepoId = "rust-lang/rust".parse().unwrap();
        assert_eq!(id.owner(), "rust-lang");
        assert_eq!(id.name(), "rust");
        assert_eq!(id.short_name(), "rust");
        assert_eq!(id.to_string(), "rust-lang/rust");
    }

    #[test]
    fn test_parse_strips_git_suffix() {
        let id: RepoId = "octocat/hello.git".parse().unwrap();
        assert_eq!(id.name(), "hello");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!("just-a-name".parse::<RepoId>().is_err());
        assert!("a/b/c".parse::<RepoId>().is_err());
        assert!("/name".parse::<RepoId>().is_err());
        assert!("owner/".parse::<RepoId>().is_err());
    }
}
