use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for fieldflow
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct FieldflowConfig {
    /// Persistence backend settings
    pub storage: StorageConfig,
    /// Workflow engine tuning
    pub engine: EngineConfig,
    /// Notification side channel
    pub notifications: NotificationConfig,
    /// Logging settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Memory,
    File,
    Sqlite,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Snapshot file for `file`, database URL for `sqlite`
    pub path: String,
    /// Maximum pooled connections (sqlite only)
    pub max_connections: u32,
    /// Run migrations on startup (sqlite only)
    pub auto_migrate: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::File,
            path: ".fieldflow/workflow.json".to_string(),
            max_connections: 10,
            auto_migrate: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Attempts at a single-writer update before giving up on version conflicts
    pub max_write_retries: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { max_write_retries: 5 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    Log,
    None,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub sink: SinkKind,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { sink: SinkKind::Log }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level or EnvFilter directive
    pub log_level: String,
    /// Emit JSON log lines instead of human-readable ones
    pub json: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            json: false,
        }
    }
}

impl FieldflowConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration file (fieldflow.toml in the working directory)
    /// 3. Environment variables (FIELDFLOW__STORAGE__BACKEND=memory, ...)
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("fieldflow.toml"))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let mut builder = Config::builder();

        if path.exists() {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix("FIELDFLOW")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = FieldflowConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.storage.backend, StorageBackend::File);
        assert_eq!(config.engine.max_write_retries, 5);
        assert_eq!(config.notifications.sink, SinkKind::Log);
    }

    #[test]
    fn test_file_overrides_defaults_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fieldflow.toml");
        std::fs::write(
            &path,
            "[storage]\nbackend = \"memory\"\n\n[engine]\nmax_write_retries = 2\n",
        )
        .unwrap();

        let config = FieldflowConfig::load_from(&path).unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.storage.path, ".fieldflow/workflow.json");
        assert_eq!(config.engine.max_write_retries, 2);

        let saved = dir.path().join("saved.toml");
        config.save_to_file(&saved).unwrap();
        let reloaded = FieldflowConfig::load_from(&saved).unwrap();
        assert_eq!(reloaded.engine.max_write_retries, 2);
        assert_eq!(reloaded.storage.backend, StorageBackend::Memory);
    }
}
