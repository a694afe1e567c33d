//! CLI configuration.

use anyhow::{bail, Context};
use pith_storage::CompressionLevel;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Settings read from an optional YAML file. Missing keys take defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Branch HEAD points at after `init`, and the clone fallback.
    pub default_branch: String,
    /// User-Agent sent to remotes.
    pub user_agent: String,
    /// Author and committer name for `commit-tree`.
    pub author_name: String,
    /// Author and committer email for `commit-tree`.
    pub author_email: String,
    /// zlib level for newly written objects.
    pub compression: CompressionLevel,
    /// HTTP timeout in seconds. Unset waits indefinitely.
    pub timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_branch: "master".to_string(),
            user_agent: format!("pith/{}", env!("CARGO_PKG_VERSION")),
            author_name: "Pith User".to_string(),
            author_email: "pith@localhost".to_string(),
            compression: CompressionLevel::default(),
            timeout_secs: None,
        }
    }
}

impl Config {
    /// Loads a YAML config file.
    pub fn load_yaml(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("invalid config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` if given, otherwise returns the defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load_yaml(path),
            None => Ok(Self::default()),
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.default_branch.is_empty() || self.default_branch.contains(char::is_whitespace) {
            bail!("invalid default_branch {:?}", self.default_branch);
        }
        if self.user_agent.is_empty() {
            bail!("user_agent is empty");
        }
        if self.author_email.contains(['<', '>']) || self.author_name.contains(['<', '>']) {
            bail!("author identity must not contain angle brackets");
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Signature line value for commits, stamped with the current time.
    pub fn identity(&self) -> String {
        let seconds = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        format!(
            "{} <{}> {seconds} +0000",
            self.author_name, self.author_email
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::load(None).unwrap();
        assert_eq!(config.default_branch, "master");
        assert!(config.user_agent.starts_with("pith/"));
        assert_eq!(config.timeout(), None);
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pith.yaml");
        std::fs::write(
            &path,
            "default_branch: main\ncompression: best\ntimeout_secs: 30\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.default_branch, "main");
        assert_eq!(config.compression, CompressionLevel::Best);
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.author_name, Config::default().author_name);
    }

    #[test]
    fn test_invalid_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pith.yaml");
        std::fs::write(&path, "compression: maximum\n").unwrap();
        assert!(Config::load(Some(&path)).is_err());

        std::fs::write(&path, "default_branch: \"two words\"\n").unwrap();
        assert!(Config::load(Some(&path)).is_err());

        assert!(Config::load(Some(&dir.path().join("absent.yaml"))).is_err());
    }

    #[test]
    fn test_identity_format() {
        let config = Config {
            author_name: "Ada".to_string(),
            author_email: "ada@example.com".to_string(),
            ..Config::default()
        };
        let identity = config.identity();
        assert!(identity.starts_with("Ada <ada@example.com> "));
        assert!(identity.ends_with(" +0000"));
    }
}
