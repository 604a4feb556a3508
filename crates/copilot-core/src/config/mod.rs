mod env;
mod types;


pub use types::*;

use std::path::Path;

use crate::error::ConfigError;

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to defaults when the file does not exist. API keys are
    /// only ever taken from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            toml::from_str::<Self>(&content)?
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        config.resolve_env_secrets();
        Ok(config)
    }

    /// Reject values the rest of the system cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.top_k == 0 {
            return Err(ConfigError::Invalid("agent.top_k must be at least 1".into()));
        }
        if self.index.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "index.batch_size must be at least 1".into(),
            ));
        }
        if self.embedding.dimension == 0 {
            return Err(ConfigError::Invalid(
                "embedding.dimension must be at least 1".into(),
            ));
        }
        if self.index.collection.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "index.collection must not be empty".into(),
            ));
        }
        if self.llm.max_tokens == 0 {
            return Err(ConfigError::Invalid(
                "llm.max_tokens must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
