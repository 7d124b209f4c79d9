pub mod parser;

pub use self::parser::{
    ConfigParser, ConfigSource, EnvConfigSource, FileConfigSource, OverrideSource,
};

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::path::Path;

use crate::core::ServiceConfig;

/// Prefix for environment variable overrides, e.g. `HOUSING_SERVER__PORT`.
pub const ENV_PREFIX: &str = "HOUSING_";

/// Resolve the service configuration.
///
/// Precedence, lowest first: built-in defaults, the TOML file, `HOUSING_*`
/// environment variables, then `overrides` (command line flags).
pub fn load_config(path: Option<&Path>, overrides: Value) -> Result<ServiceConfig> {
    load_config_with_prefix(path, overrides, ENV_PREFIX)
}

pub fn load_config_with_prefix(
    path: Option<&Path>,
    overrides: Value,
    env_prefix: &str,
) -> Result<ServiceConfig> {
    if let Some(path) = path {
        if !path.exists() {
            bail!("Configuration file not found: {}", path.display());
        }
    }

    let defaults = serde_json::to_value(ServiceConfig::default())
        .context("Failed to serialize default configuration")?;

    let file = path.map(|p| FileConfigSource {
        path: p.to_path_buf(),
    });
    let env = EnvConfigSource {
        prefix: env_prefix.to_string(),
    };
    let overrides = OverrideSource { values: overrides };

    let mut sources: Vec<&dyn ConfigSource> = Vec::with_capacity(3);
    if let Some(file) = &file {
        sources.push(file);
    }
    sources.push(&env);
    sources.push(&overrides);

    let config: ServiceConfig = ConfigParser::resolve(defaults, &sources)?;
    config.validate()?;
    Ok(config)
}
