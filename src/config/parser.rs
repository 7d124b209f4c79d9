use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fs;
use std::path::PathBuf;

/// Layered configuration parser
pub struct ConfigParser;

impl ConfigParser {
    /// Merge `overlay` on top of `base` (RFC 7396 merge patch semantics).
    pub fn merge_values(base: &mut Value, overlay: &Value) {
        json_patch::merge(base, overlay);
    }

    /// Merge every source in order, later sources winning, then deserialize.
    ///
    /// `base` doubles as the type template: a number or boolean from a source
    /// lands as a string wherever `base` holds a string.
    pub fn resolve<T>(base: Value, sources: &[&dyn ConfigSource]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let shape = base.clone();
        let mut merged = base;
        for source in sources {
            if let Some(mut overlay) = source.load_config()? {
                Self::coerce_scalars(&shape, &mut overlay);
                Self::merge_values(&mut merged, &overlay);
            }
        }

        serde_json::from_value(merged).context("Failed to deserialize merged configuration")
    }

    fn coerce_scalars(shape: &Value, overlay: &mut Value) {
        match (shape, overlay) {
            (Value::Object(shape), Value::Object(overlay)) => {
                for (key, value) in overlay.iter_mut() {
                    if let Some(expected) = shape.get(key) {
                        Self::coerce_scalars(expected, value);
                    }
                }
            }
            (Value::String(_), value) if value.is_number() || value.is_boolean() => {
                let text = value.to_string();
                *value = Value::String(text);
            }
            _ => {}
        }
    }
}

/// Trait for configuration sources
pub trait ConfigSource {
    fn load_config(&self) -> Result<Option<Value>>;
}

/// TOML file configuration source. A missing file contributes nothing.
pub struct FileConfigSource {
    pub path: PathBuf,
}

impl ConfigSource for FileConfigSource {
    fn load_config(&self) -> Result<Option<Value>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read config file: {}", self.path.display()))?;

        let config: Value = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", self.path.display()))?;

        Ok(Some(config))
    }
}

/// Environment variable configuration source.
///
/// `PREFIX_SERVER__PORT=9000` becomes `{"server": {"port": 9000}}`. Numbers
/// and booleans are parsed, everything else stays a string.
pub struct EnvConfigSource {
    pub prefix: String,
}

impl EnvConfigSource {
    fn parse_value(raw: &str) -> Value {
        match serde_json::from_str::<Value>(raw) {
            Ok(value @ (Value::Number(_) | Value::Bool(_))) => value,
            _ => Value::String(raw.to_string()),
        }
    }

    fn insert_path(root: &mut Map<String, Value>, path: &[String], value: Value) {
        match path {
            [] => {}
            [leaf] => {
                root.insert(leaf.clone(), value);
            }
            [head, rest @ ..] => {
                let entry = root
                    .entry(head.clone())
                    .or_insert_with(|| Value::Object(Map::new()));
                if !entry.is_object() {
                    *entry = Value::Object(Map::new());
                }
                if let Value::Object(child) = entry {
                    Self::insert_path(child, rest, value);
                }
            }
        }
    }

    fn from_vars(&self, vars: impl Iterator<Item = (String, String)>) -> Option<Value> {
        let mut root = Map::new();

        for (key, value) in vars {
            let Some(stripped) = key.strip_prefix(&self.prefix) else {
                continue;
            };
            let path: Vec<String> = stripped
                .split("__")
                .filter(|segment| !segment.is_empty())
                .map(str::to_lowercase)
                .collect();
            Self::insert_path(&mut root, &path, Self::parse_value(&value));
        }

        if root.is_empty() {
            None
        } else {
            Some(Value::Object(root))
        }
    }
}

impl ConfigSource for EnvConfigSource {
    fn load_config(&self) -> Result<Option<Value>> {
        Ok(self.from_vars(std::env::vars()))
    }
}

/// Fixed overrides, typically collected from command line flags.
pub struct OverrideSource {
    pub values: Value,
}

impl ConfigSource for OverrideSource {
    fn load_config(&self) -> Result<Option<Value>> {
        match &self.values {
            Value::Object(map) if map.is_empty() => Ok(None),
            Value::Null => Ok(None),
            other => Ok(Some(other.clone())),
        }
    }
}
