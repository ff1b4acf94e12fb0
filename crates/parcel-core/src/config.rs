//! Loader configuration (parcel.toml)
//!
//! ```toml
//! [loader]
//! search_paths = ["lib", "."]
//! load_timeout_ms = 30000
//!
//! [bindings]
//! default_strategy = "method"
//! on_conflict = "warn"
//! ```

use crate::strategy::{ConflictPolicy, Strategy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Config file name looked up by [`find_config`]
pub const CONFIG_FILE: &str = "parcel.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParcelConfig {
    pub loader: LoaderConfig,
    pub bindings: BindingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Roots searched in order for artifact files
    pub search_paths: Vec<PathBuf>,

    /// How long to wait for another caller's load of the same artifact
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_timeout_ms: Option<u64>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            search_paths: vec![PathBuf::from(".")],
            load_timeout_ms: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingConfig {
    /// Strategy used when an import names none
    pub default_strategy: Strategy,
    pub on_conflict: ConflictPolicy,
}

impl ParcelConfig {
    /// Parse a config file. Relative search paths are taken relative to the
    /// file's directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_str(&content)?;
        if let Some(base) = path.parent() {
            for root in &mut config.loader.search_paths {
                if root.is_relative() {
                    *root = base.join(&*root);
                }
            }
        }
        Ok(config)
    }

    /// Parse config from a string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: ParcelConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.loader.search_paths.is_empty() {
            return Err(ConfigError::ValidationError(
                "loader.search_paths cannot be empty".to_string(),
            ));
        }
        if self.loader.load_timeout_ms == Some(0) {
            return Err(ConfigError::ValidationError(
                "loader.load_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Replace the search roots
    pub fn with_search_paths(mut self, search_paths: Vec<PathBuf>) -> Self {
        self.loader.search_paths = search_paths;
        self
    }

    pub fn load_timeout(&self) -> Option<Duration> {
        self.loader.load_timeout_ms.map(Duration::from_millis)
    }
}

/// Walk up from `start_dir` to the nearest directory holding a config file
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir;

    loop {
        let candidate = current.join(CONFIG_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }

        current = current.parent()?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_defaults() {
        let config = ParcelConfig::from_str("").unwrap();
        assert_eq!(config, ParcelConfig::default());
        assert_eq!(config.loader.search_paths, vec![PathBuf::from(".")]);
        assert_eq!(config.bindings.default_strategy, Strategy::Method);
        assert_eq!(config.bindings.on_conflict, ConflictPolicy::Warn);
        assert_eq!(config.load_timeout(), None);
    }

    #[test]
    fn test_parse_full() {
        let config = ParcelConfig::from_str(
            r#"
            [loader]
            search_paths = ["lib", "vendor"]
            load_timeout_ms = 250

            [bindings]
            default_strategy = "const"
            on_conflict = "error"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.loader.search_paths,
            vec![PathBuf::from("lib"), PathBuf::from("vendor")]
        );
        assert_eq!(config.load_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.bindings.default_strategy, Strategy::Constant);
        assert_eq!(config.bindings.on_conflict, ConflictPolicy::Error);
    }

    #[test]
    fn test_rejects_unknown_strategy() {
        let result = ParcelConfig::from_str("[bindings]\ndefault_strategy = \"global\"\n");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            ParcelConfig::from_str("[loader]\nsearch_paths = []\n"),
            Err(ConfigError::ValidationError(_))
        ));
        assert!(matches!(
            ParcelConfig::from_str("[loader]\nload_timeout_ms = 0\n"),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_from_file_rebases_search_paths() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join(CONFIG_FILE);
        fs::write(&file, "[loader]\nsearch_paths = [\"lib\", \"/abs\"]\n").unwrap();

        let config = ParcelConfig::from_file(&file).unwrap();
        assert_eq!(
            config.loader.search_paths,
            vec![temp.path().join("lib"), PathBuf::from("/abs")]
        );
    }

    #[test]
    fn test_find_config_walks_up() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        fs::write(root.join(CONFIG_FILE), "").unwrap();
        let nested = root.join("a/b/c");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_config(&nested), Some(root.join(CONFIG_FILE)));
    }
}
