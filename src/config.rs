use crate::models::Id;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Settings as they appear in `config.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    data_dir: Option<String>,
    remote_dir: Option<String>,
    user: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Directory of the local store.
    pub data_dir: PathBuf,
    /// Directory of the remote store. Sync is unavailable without one.
    pub remote_dir: Option<PathBuf>,
    /// Account decks and progress are synced for. Anonymous if unset.
    pub user: Option<Id>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_dir()
                .map(|d| d.join("flips"))
                .unwrap_or_else(|| PathBuf::from("flips")),
            remote_dir: None,
            user: None,
        }
    }
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("flips").join("config.toml"))
    }

    /// Loads the config file at `path`, or at [`Config::default_path`] if none
    /// is given. Only an explicitly named file has to exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) if !path.exists() => {
                return Err(anyhow!("Config file {:?} doesn't exist.", path));
            }
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file {:?}", path))?;
        Self::from_toml(&content).with_context(|| format!("failed to parse TOML config {:?}", path))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let file: FileConfig = toml::from_str(content)?;
        let mut config = Self::default();
        if let Some(data_dir) = file.data_dir {
            config.data_dir = expand_home(&data_dir);
        }
        config.remote_dir = file
            .remote_dir
            .filter(|d| !d.trim().is_empty())
            .map(|d| expand_home(&d));
        config.user = file.user.filter(|u| !u.trim().is_empty()).map(Id::from);
        Ok(config)
    }
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

#[test]
fn test_config_from_toml() {
    let config = Config::from_toml(
        r#"
        data_dir = "/tmp/flips"
        remote_dir = "/mnt/share/flips"
        user = "Alice@Example.com"
        "#,
    )
    .unwrap();
    assert_eq!(config.data_dir, PathBuf::from("/tmp/flips"));
    assert_eq!(config.remote_dir, Some(PathBuf::from("/mnt/share/flips")));
    assert_eq!(config.user, Some(Id::new("alice@example.com")));
}

#[test]
fn test_empty_config_uses_defaults() {
    let config = Config::from_toml("user = \"  \"").unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_unknown_key_is_rejected() {
    assert!(Config::from_toml("remote = \"/tmp\"").is_err());
}

#[test]
fn test_missing_explicit_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    let result = Config::load(Some(&dir.path().join("nope.toml")));
    assert!(result.is_err());
}
