use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::schema::ForemanConfig;

/// Loads the Foreman configuration from disk.
pub struct ConfigLoader {
    config: Arc<RwLock<ForemanConfig>>,
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Resolve the config path: explicit path > FOREMAN_CONFIG env > ~/.foreman/foreman.toml
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(p) = explicit {
            return p.to_path_buf();
        }
        if let Ok(p) = std::env::var("FOREMAN_CONFIG") {
            return PathBuf::from(p);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".foreman")
            .join("foreman.toml")
    }

    /// Load the config from disk, falling back to defaults.
    pub fn load(path: Option<&Path>) -> foreman_core::Result<Self> {
        let config_path = Self::resolve_path(path);
        let config = if config_path.exists() {
            info!(?config_path, "loading configuration");
            let raw = std::fs::read_to_string(&config_path)?;
            toml::from_str::<ForemanConfig>(&raw).map_err(|e| {
                foreman_core::ForemanError::Config(format!(
                    "failed to parse {}: {}",
                    config_path.display(),
                    e
                ))
            })?
        } else {
            warn!(?config_path, "config file not found, using defaults");
            ForemanConfig::default()
        };

        let config = Self::apply_env_overrides(config);

        // Log warnings, fail on errors
        match config.validate() {
            Ok(warnings) => {
                for w in &warnings {
                    warn!("{}", w);
                }
            }
            Err(e) => {
                return Err(foreman_core::ForemanError::Config(e));
            }
        }

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path,
        })
    }

    /// Get a read snapshot of the current config.
    pub fn get(&self) -> ForemanConfig {
        self.config.read().clone()
    }

    /// Get a shared reference for long-lived components.
    pub fn shared(&self) -> Arc<RwLock<ForemanConfig>> {
        Arc::clone(&self.config)
    }

    /// Path the config was loaded from.
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Apply env var overrides (FOREMAN_LLM_MODEL, FOREMAN_MAX_ITERATIONS, etc.)
    fn apply_env_overrides(mut config: ForemanConfig) -> ForemanConfig {
        if let Ok(v) = std::env::var("FOREMAN_LLM_MODEL") {
            config.llm.model = v;
        }
        if let Ok(v) = std::env::var("FOREMAN_FALLBACK_MODEL") {
            config.llm.fallback_model = Some(v);
        }
        if let Ok(v) = std::env::var("FOREMAN_MAX_ITERATIONS") {
            if let Ok(n) = v.parse::<u32>() {
                config.supervisor.max_iterations = n;
            }
        }
        if let Ok(v) = std::env::var("FOREMAN_DB_PATH") {
            config.store.db_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("FOREMAN_LOG_LEVEL") {
            config.logging.level = v;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn explicit_path_wins() {
        let path = Path::new("/tmp/custom-foreman.toml");
        assert_eq!(ConfigLoader::resolve_path(Some(path)), path);
    }

    #[test]
    fn loads_file_and_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foreman.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "[supervisor]\nmax_iterations = 10").unwrap();

        let loader = ConfigLoader::load(Some(&path)).unwrap();
        let config = loader.get();
        assert_eq!(config.supervisor.max_iterations, 10);
        assert_eq!(config.llm.max_tokens, 2048);
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does-not-exist.toml");
        let loader = ConfigLoader::load(Some(&path)).unwrap();
        assert_eq!(loader.get().supervisor.max_iterations, 50);
    }

    #[test]
    fn invalid_config_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foreman.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "[llm]\nmax_tokens = 0").unwrap();

        assert!(ConfigLoader::load(Some(&path)).is_err());
    }
}
