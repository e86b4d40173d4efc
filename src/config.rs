use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::content::source::DEFAULT_MODEL_HINT;
use crate::content::{Difficulty, Scheme};
use crate::store::content_store::DEFAULT_CAPACITY;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_scheme")]
    pub scheme: Scheme,
    #[serde(default = "default_difficulty")]
    pub difficulty: Difficulty,
    #[serde(default = "default_continuous_mode")]
    pub continuous_mode: bool,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub content_endpoint: Option<String>,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_scheme() -> Scheme {
    Scheme::Phonetic
}
fn default_difficulty() -> Difficulty {
    Difficulty::Beginner
}
fn default_continuous_mode() -> bool {
    true
}
fn default_cache_capacity() -> usize {
    DEFAULT_CAPACITY
}
fn default_history_limit() -> usize {
    500
}
fn default_model() -> String {
    DEFAULT_MODEL_HINT.to_string()
}
fn default_data_dir() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hanzidr")
        .to_string_lossy()
        .to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scheme: default_scheme(),
            difficulty: default_difficulty(),
            continuous_mode: default_continuous_mode(),
            cache_capacity: default_cache_capacity(),
            history_limit: default_history_limit(),
            model: default_model(),
            content_endpoint: None,
            data_dir: default_data_dir(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            let mut config: Config = toml::from_str(&content)?;
            config.validate();
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hanzidr")
            .join("config.toml")
    }

    /// Clamp out-of-range values left by hand edits.
    pub fn validate(&mut self) {
        self.cache_capacity = self.cache_capacity.clamp(1, 1000);
        self.history_limit = self.history_limit.max(1);
        if self.model.trim().is_empty() {
            self.model = default_model();
        }
        if self
            .content_endpoint
            .as_deref()
            .is_some_and(|e| e.trim().is_empty())
        {
            self.content_endpoint = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serde_defaults_from_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.scheme, Scheme::Phonetic);
        assert_eq!(config.difficulty, Difficulty::Beginner);
        assert!(config.continuous_mode);
        assert_eq!(config.cache_capacity, 50);
        assert_eq!(config.history_limit, 500);
        assert_eq!(config.model, DEFAULT_MODEL_HINT);
        assert!(config.content_endpoint.is_none());
        assert!(config.data_dir.contains("hanzidr"));
    }

    #[test]
    fn test_config_partial_file() {
        let toml_str = r#"
scheme = "structural"
difficulty = "advanced"
continuous_mode = false
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.scheme, Scheme::Structural);
        assert_eq!(config.difficulty, Difficulty::Advanced);
        assert!(!config.continuous_mode);
        assert_eq!(config.cache_capacity, 50);
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let mut config = Config::default();
        config.content_endpoint = Some("http://localhost:8080/generate".to_string());
        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(config.scheme, deserialized.scheme);
        assert_eq!(config.cache_capacity, deserialized.cache_capacity);
        assert_eq!(config.content_endpoint, deserialized.content_endpoint);
        assert_eq!(config.data_dir, deserialized.data_dir);
    }

    #[test]
    fn test_validate_clamps_values() {
        let mut config = Config::default();
        config.cache_capacity = 0;
        config.history_limit = 0;
        config.model = "  ".to_string();
        config.content_endpoint = Some(String::new());
        config.validate();

        assert_eq!(config.cache_capacity, 1);
        assert_eq!(config.history_limit, 1);
        assert_eq!(config.model, DEFAULT_MODEL_HINT);
        assert!(config.content_endpoint.is_none());
    }

    #[test]
    fn test_unknown_scheme_is_rejected() {
        assert!(toml::from_str::<Config>(r#"scheme = "cangjie""#).is_err());
    }
}
