//! Configuration loading for fathom.
//!
//! Settings resolve in three layers: built-in defaults, then an optional
//! `fathom.toml` (project directory first, user config directory as
//! fallback), then environment variables. Credentials are deliberately not
//! part of this struct - API keys live only in the environment, are read at
//! call time by the providers, and are never persisted or logged.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FathomError, Result};

/// Name of the optional configuration file.
pub const CONFIG_FILE: &str = "fathom.toml";

/// Tunable settings for one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Analyzer model identifier.
    pub model: String,
    /// Timeout for each external call, in seconds.
    pub timeout_secs: u64,
    /// Log backend base URL.
    pub backend_url: String,
    /// Source locale of analyzer output.
    pub source_locale: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: crate::llm::GroqProvider::DEFAULT_MODEL.to_string(),
            timeout_secs: 60,
            backend_url: crate::backend::UrBackend::DEFAULT_API_BASE.to_string(),
            source_locale: "en".to_string(),
        }
    }
}

impl Config {
    /// Load configuration for the given project directory.
    ///
    /// A missing config file is not an error; a present but unparsable one
    /// is, since silently ignoring it would mask typos.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let mut config = match Self::find_config_file(project_dir) {
            Some(path) => {
                debug!("loading config from {}", path.display());
                let raw = std::fs::read_to_string(&path)?;
                toml::from_str(&raw).map_err(|e| {
                    FathomError::config(format!("cannot parse {}: {e}", path.display()))
                })?
            }
            None => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Locate `fathom.toml`: project directory first, then the user config
    /// directory.
    fn find_config_file(project_dir: &Path) -> Option<PathBuf> {
        let project_config = project_dir.join(CONFIG_FILE);
        if project_config.exists() {
            return Some(project_config);
        }
        let user_config = dirs::config_dir()?.join("fathom").join(CONFIG_FILE);
        user_config.exists().then_some(user_config)
    }

    /// Apply environment variable overrides on top of file/default values.
    fn apply_env_overrides(&mut self) {
        if let Ok(model) = std::env::var("FATHOM_MODEL") {
            if !model.is_empty() {
                self.model = model;
            }
        }
        if let Ok(timeout) = std::env::var("FATHOM_TIMEOUT_SECS") {
            if let Ok(secs) = timeout.parse() {
                self.timeout_secs = secs;
            }
        }
        if let Ok(url) = std::env::var("FATHOM_BACKEND_URL") {
            if !url.is_empty() {
                self.backend_url = url;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_config_file() {
        let temp = TempDir::new().unwrap();
        let config = Config::load(temp.path()).unwrap();
        assert_eq!(config.model, crate::llm::GroqProvider::DEFAULT_MODEL);
        assert_eq!(config.timeout_secs, 60);
        assert_eq!(config.source_locale, "en");
    }

    #[test]
    fn test_project_file_overrides_defaults() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(CONFIG_FILE),
            "model = \"llama-3.3-70b-versatile\"\ntimeout_secs = 15\n",
        )
        .unwrap();

        let config = Config::load(temp.path()).unwrap();
        assert_eq!(config.model, "llama-3.3-70b-versatile");
        assert_eq!(config.timeout_secs, 15);
        // Unspecified keys keep their defaults.
        assert_eq!(config.source_locale, "en");
    }

    #[test]
    fn test_unparsable_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(CONFIG_FILE), "model = [not toml").unwrap();

        let err = Config::load(temp.path()).unwrap_err();
        assert!(matches!(err, FathomError::Config { .. }));
    }

    #[test]
    fn test_config_roundtrips_through_toml() {
        let config = Config {
            model: "m".to_string(),
            timeout_secs: 9,
            backend_url: "http://localhost:1".to_string(),
            source_locale: "de".to_string(),
        };
        let raw = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&raw).unwrap();
        assert_eq!(parsed, config);
    }
}
