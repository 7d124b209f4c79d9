use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::error::{PredictorError, PredictorResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub enable_cors: bool,
    pub service_name: String,
    pub max_body_bytes: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            enable_cors: true,
            service_name: "California Housing Price Prediction API".to_string(),
            max_body_bytes: 64 * 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub path: PathBuf,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/models/california_gb.json"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl ServiceConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings that would only fail later, at bind or load time.
    pub fn validate(&self) -> PredictorResult<()> {
        if self.server.host.trim().is_empty() {
            return Err(PredictorError::Config("server.host must not be empty".to_string()));
        }
        if self.server.max_body_bytes == 0 {
            return Err(PredictorError::Config(
                "server.max_body_bytes must be positive".to_string(),
            ));
        }
        if self.model.path.as_os_str().is_empty() {
            return Err(PredictorError::Config("model.path must not be empty".to_string()));
        }
        Ok(())
    }

    /// Socket address string the server binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: ServiceConfig = toml::from_str(
            r#"
            [server]
            port = 9100

            [model]
            path = "./models/housing.json"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.model.path, PathBuf::from("./models/housing.json"));
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("conf").join("housing.toml");

        let mut config = ServiceConfig::default();
        config.logging.format = LogFormat::Json;
        config.save(&path).unwrap();

        assert_eq!(ServiceConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn validate_rejects_empty_model_path() {
        let mut config = ServiceConfig::default();
        assert!(config.validate().is_ok());

        config.model.path = PathBuf::new();
        let err = config.validate().unwrap_err();
        assert_eq!(err.code(), "config_error");
    }

    #[test]
    fn bind_address_joins_host_and_port() {
        assert_eq!(ServiceConfig::default().bind_address(), "0.0.0.0:8000");
    }
}
