use crate::{DiscoveryError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Name of the optional per-project configuration file.
pub const CONFIG_FILE_NAME: &str = "buildspec.toml";

pub const DEFAULT_BUILD_FILE_NAME: &str = "BUCK";

const ENV_BUILD_FILE_NAME: &str = "BUILDSPEC_BUILD_FILE_NAME";
const ENV_SEARCH_METHOD: &str = "BUILDSPEC_SEARCH_METHOD";

/// How recursive specs look for build files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMethod {
    /// Ask the index service first; crawl when it is unavailable.
    #[default]
    Watchman,
    /// Always crawl the filesystem.
    Filesystem,
}

impl fmt::Display for SearchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Watchman => f.write_str("watchman"),
            Self::Filesystem => f.write_str("filesystem"),
        }
    }
}

impl FromStr for SearchMethod {
    type Err = DiscoveryError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "watchman" => Ok(Self::Watchman),
            "filesystem" | "fs" => Ok(Self::Filesystem),
            other => Err(DiscoveryError::Config(format!(
                "unknown search method '{other}' (expected watchman or filesystem)"
            ))),
        }
    }
}

/// Discovery settings for one project root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// File name that marks a build file.
    pub build_file_name: String,

    pub search_method: SearchMethod,

    /// Index service socket; falls back to `WATCHMAN_SOCK` when unset.
    pub watchman_socket: Option<PathBuf>,

    /// Gitignore-style patterns, relative to the project root, hidden from
    /// index results.
    pub ignore: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            build_file_name: DEFAULT_BUILD_FILE_NAME.to_string(),
            search_method: SearchMethod::default(),
            watchman_socket: None,
            ignore: vec![
                "buck-out".to_string(),
                ".git".to_string(),
                ".hg".to_string(),
            ],
        }
    }
}

impl DiscoveryConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|err| DiscoveryError::Config(err.to_string()))
    }

    /// Load `buildspec.toml` from `root` when present, then apply
    /// environment overrides.
    pub fn load(root: &Path) -> Result<Self> {
        let mut config = Self::load_file(root)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// `buildspec.toml` from `root`, or the defaults when it is absent.
    pub fn load_file(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE_NAME);
        match std::fs::read_to_string(&path) {
            Ok(raw) => {
                log::debug!("Loading discovery config from {}", path.display());
                Self::from_toml_str(&raw)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err.into()),
        }
    }

    /// Apply overrides from a variable lookup. Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let read = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(name) = read(ENV_BUILD_FILE_NAME) {
            self.build_file_name = name;
        }
        if let Some(method) = read(ENV_SEARCH_METHOD) {
            self.search_method = method.parse()?;
        }
        if self.watchman_socket.is_none() {
            self.watchman_socket = read(buildspec_protocol::SOCKET_ENV).map(PathBuf::from);
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        let name = self.build_file_name.as_str();
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(DiscoveryError::Config(format!(
                "build_file_name must be a plain file name, got '{name}'"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn toml_overrides_defaults() {
        let config = DiscoveryConfig::from_toml_str(
            r#"
            build_file_name = "BUILD"
            search_method = "filesystem"
            ignore = ["third-party"]
            "#,
        )
        .unwrap();
        assert_eq!(config.build_file_name, "BUILD");
        assert_eq!(config.search_method, SearchMethod::Filesystem);
        assert_eq!(config.ignore, vec!["third-party".to_string()]);
        assert_eq!(config.watchman_socket, None);
    }

    #[test]
    fn env_overrides_are_trimmed_and_empty_ignored() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("BUILDSPEC_BUILD_FILE_NAME", "   "),
            ("BUILDSPEC_SEARCH_METHOD", " FS "),
            ("WATCHMAN_SOCK", "/tmp/wm.sock"),
        ]);
        let mut config = DiscoveryConfig::default();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.build_file_name, DEFAULT_BUILD_FILE_NAME);
        assert_eq!(config.search_method, SearchMethod::Filesystem);
        assert_eq!(config.watchman_socket, Some(PathBuf::from("/tmp/wm.sock")));
    }

    #[test]
    fn explicit_socket_wins_over_env() {
        let mut config = DiscoveryConfig {
            watchman_socket: Some(PathBuf::from("/explicit.sock")),
            ..Default::default()
        };
        config
            .apply_overrides(|key| (key == "WATCHMAN_SOCK").then(|| "/env.sock".to_string()))
            .unwrap();
        assert_eq!(config.watchman_socket, Some(PathBuf::from("/explicit.sock")));
    }

    #[test]
    fn rejects_unknown_search_method_and_bad_names() {
        assert!("inotify".parse::<SearchMethod>().is_err());

        let config = DiscoveryConfig {
            build_file_name: "a/BUCK".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(DiscoveryError::Config(_))));
    }

    #[test]
    fn load_reads_project_file() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(
            temp.path().join(CONFIG_FILE_NAME),
            "build_file_name = \"TARGETS\"\n",
        )
        .unwrap();
        let mut config = DiscoveryConfig::load_file(temp.path()).unwrap();
        assert_eq!(config.build_file_name, "TARGETS");

        config
            .apply_overrides(|key| (key == "BUILDSPEC_SEARCH_METHOD").then(|| "fs".to_string()))
            .unwrap();
        assert_eq!(config.build_file_name, "TARGETS");
        assert_eq!(config.search_method, SearchMethod::Filesystem);
    }

    #[test]
    fn missing_project_file_gives_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let config = DiscoveryConfig::load_file(temp.path()).unwrap();
        assert_eq!(config, DiscoveryConfig::default());
    }
}
