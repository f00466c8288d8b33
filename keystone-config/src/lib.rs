// Layered configuration for Keystone services.
//
// Sources are applied in the order they are loaded; a later source
// overwrites keys set by an earlier one.

pub mod env;
pub mod error;
pub mod loader;
pub mod validation;

pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use validation::{ConfigValidator, Validate};

use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

/// Prefix for environment variables read by Keystone services
pub const ENV_PREFIX: &str = "KEYSTONE";

type Store = HashMap<String, serde_json::Value>;

/// Main configuration manager
#[derive(Clone, Default)]
pub struct ConfigManager {
    config: Arc<RwLock<Store>>,
    env_prefix: Option<String>,
}

impl ConfigManager {
    /// Create a new configuration manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with environment variable prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            config: Arc::default(),
            env_prefix: Some(prefix.into()),
        }
    }

    /// Builder for a manager that loads its sources eagerly
    pub fn builder() -> ConfigManagerBuilder {
        ConfigManagerBuilder::new()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Store> {
        self.config.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Store> {
        self.config.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load configuration from environment variables
    pub fn load_env(&self) -> Result<()> {
        let loader = EnvLoader::new(self.env_prefix.clone());
        self.apply_env(loader.load()?);
        Ok(())
    }

    /// Load configuration from explicit variable pairs, applying the prefix
    pub fn load_vars<I>(&self, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let loader = EnvLoader::new(self.env_prefix.clone());
        self.apply_env(loader.load_from(vars));
    }

    fn apply_env(&self, vars: HashMap<String, String>) {
        let mut config = self.write();
        for (key, value) in vars {
            config.insert(key, env::coerce_value(&value));
        }
    }

    /// Load configuration from .env file, then from the environment
    pub fn load_dotenv(&self, path: Option<&Path>) -> Result<()> {
        if let Some(path) = path {
            dotenvy::from_path(path).map_err(|e| ConfigError::LoadError(e.to_string()))?;
        } else {
            dotenvy::dotenv().ok(); // Ignore if .env doesn't exist
        }
        self.load_env()
    }

    /// Load configuration from file
    pub fn load_file(&self, path: impl AsRef<Path>, format: FileFormat) -> Result<()> {
        let loader = ConfigLoader::new(format);
        let data = loader.load_file(path)?;

        match data {
            serde_json::Value::Object(map) => {
                let mut config = self.write();
                for (key, value) in map {
                    config.insert(key, value);
                }
                Ok(())
            }
            other => Err(ConfigError::ParseError(format!(
                "configuration root must be a table, found {}",
                other
            ))),
        }
    }

    /// Set a configuration value
    pub fn set<T: serde::Serialize>(&self, key: &str, value: T) -> Result<()> {
        let json_value = serde_json::to_value(value)
            .map_err(|e| ConfigError::SerializationError(e.to_string()))?;

        self.write().insert(key.to_string(), json_value);

        Ok(())
    }

    /// Get a configuration value
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))?;

        serde_json::from_value(value).map_err(|e| ConfigError::DeserializationError(e.to_string()))
    }

    /// Get a configuration value with default
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    /// Check if a key exists
    pub fn has(&self, key: &str) -> bool {
        self.read().contains_key(key)
    }

    /// Get all configuration keys
    pub fn keys(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    /// Merge configuration from another manager
    pub fn merge(&self, other: &ConfigManager) {
        let snapshot = other.read().clone();
        let mut config = self.write();
        config.extend(snapshot);
    }

    /// Deserialize the whole configuration into `T` and validate it
    pub fn load_validated<T: DeserializeOwned + Validate>(&self) -> Result<T> {
        let json_value = serde_json::Value::Object(
            self.read()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        );

        let validated: T = serde_json::from_value(json_value)
            .map_err(|e| ConfigError::DeserializationError(e.to_string()))?;

        validated.validate()?;

        Ok(validated)
    }
}

/// Builder for [`ConfigManager`]
pub struct ConfigManagerBuilder {
    prefix: Option<String>,
    load_env: bool,
    load_dotenv: bool,
    dotenv_path: Option<String>,
    config_files: Vec<(String, FileFormat)>,
}

impl ConfigManagerBuilder {
    pub fn new() -> Self {
        Self {
            prefix: None,
            load_env: false,
            load_dotenv: false,
            dotenv_path: None,
            config_files: Vec::new(),
        }
    }

    /// Set environment variable prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Enable loading from environment variables
    pub fn load_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Enable loading from .env file
    pub fn load_dotenv(mut self, path: Option<String>) -> Self {
        self.load_dotenv = true;
        self.dotenv_path = path;
        self
    }

    /// Add configuration file to load
    pub fn add_file(mut self, path: impl Into<String>, format: FileFormat) -> Self {
        self.config_files.push((path.into(), format));
        self
    }

    /// Build the manager. Files load first so the environment can override them.
    pub fn build(self) -> Result<ConfigManager> {
        let manager = match self.prefix {
            Some(prefix) => ConfigManager::with_prefix(prefix),
            None => ConfigManager::new(),
        };

        for (path, format) in &self.config_files {
            manager.load_file(path, *format)?;
        }

        if self.load_dotenv {
            manager.load_dotenv(self.dotenv_path.as_deref().map(Path::new))?;
        } else if self.load_env {
            manager.load_env()?;
        }

        Ok(manager)
    }
}

impl Default for ConfigManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
