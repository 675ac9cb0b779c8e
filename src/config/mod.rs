//! Configuration management for `deck_sync`.
//!
//! Configuration sources and precedence (highest wins):
//! 1. CLI overrides
//! 2. Environment variables (`DECKSYNC_*`)
//! 3. Project config (./.decksync.yaml)
//! 4. User config (~/.config/decksync/config.yaml)
//! 5. Defaults

use crate::error::{Result, SyncError};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default AnkiConnect endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8765";
/// AnkiConnect API version sent with every request.
pub const DEFAULT_API_VERSION: u32 = 6;
/// Deck prefix suggested when none is configured.
pub const DEFAULT_BASE_COLLECTION: &str = "ATPL";
/// Append-only log of cards that failed to import.
pub const DEFAULT_FAILURE_LOG: &str = "anki_import_log.txt";
/// Project config filename, looked up in the working directory.
pub const PROJECT_CONFIG_FILENAME: &str = ".decksync.yaml";

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_HEALTH_TIMEOUT_SECS: u64 = 2;
const ENV_PREFIX: &str = "DECKSYNC_";

/// A flat layer of normalized config keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigLayer {
    pub values: HashMap<String, String>,
}

impl ConfigLayer {
    /// Merge another layer on top of this one (higher precedence wins).
    pub fn merge_from(&mut self, other: &Self) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
    }

    /// Merge multiple layers in precedence order (lowest to highest).
    #[must_use]
    pub fn merge_layers(layers: &[Self]) -> Self {
        let mut merged = Self::default();
        for layer in layers {
            merged.merge_from(layer);
        }
        merged
    }

    /// Build a layer from a YAML file path. Missing files return empty config.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn from_yaml(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let value: serde_yaml::Value = serde_yaml::from_str(&contents)?;
        Ok(layer_from_yaml_value(&value))
    }

    /// Build a layer from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_vars(env::vars())
    }

    /// Build a layer from `DECKSYNC_*` variables.
    #[must_use]
    pub fn from_env_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut layer = Self::default();
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                layer.insert(stripped, value);
            }
        }
        layer
    }

    fn insert(&mut self, key: &str, value: String) {
        self.values.insert(normalize_key(key), value);
    }

    fn get(&self, key: &str) -> Option<&String> {
        self.values.get(key)
    }
}

/// CLI overrides for config loading (optional).
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub endpoint: Option<String>,
    pub base_collection: Option<String>,
    pub failure_log: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
}

impl CliOverrides {
    #[must_use]
    pub fn as_layer(&self) -> ConfigLayer {
        let mut layer = ConfigLayer::default();

        if let Some(endpoint) = &self.endpoint {
            layer.insert("endpoint", endpoint.clone());
        }
        if let Some(base) = &self.base_collection {
            layer.insert("base-collection", base.clone());
        }
        if let Some(path) = &self.failure_log {
            layer.insert("failure-log", path.to_string_lossy().to_string());
        }
        if let Some(timeout) = self.timeout_secs {
            layer.insert("timeout-secs", timeout.to_string());
        }

        layer
    }
}

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub endpoint: String,
    pub api_version: u32,
    /// Suggested deck prefix; `-` means "no prefix".
    pub base_collection: String,
    pub failure_log: PathBuf,
    pub timeout: Duration,
    pub health_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_version: DEFAULT_API_VERSION,
            base_collection: DEFAULT_BASE_COLLECTION.to_string(),
            failure_log: PathBuf::from(DEFAULT_FAILURE_LOG),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            health_timeout: Duration::from_secs(DEFAULT_HEALTH_TIMEOUT_SECS),
        }
    }
}

impl SyncConfig {
    /// Resolve typed settings from a merged layer.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be parsed or the endpoint is not an
    /// HTTP URL.
    pub fn from_layer(layer: &ConfigLayer) -> Result<Self> {
        let mut config = Self::default();

        if let Some(endpoint) = layer.get("endpoint") {
            let endpoint = endpoint.trim();
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(SyncError::Config(format!(
                    "endpoint must be an http(s) URL, got '{endpoint}'"
                )));
            }
            config.endpoint = endpoint.to_string();
        }
        if let Some(version) = parse_number::<u32>(layer, "api-version")? {
            config.api_version = version;
        }
        if let Some(base) = layer.get("base-collection") {
            config.base_collection = base.trim().to_string();
        }
        if let Some(path) = layer.get("failure-log") {
            config.failure_log = PathBuf::from(path.trim());
        }
        if let Some(secs) = parse_number::<u64>(layer, "timeout-secs")? {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_number::<u64>(layer, "health-timeout-secs")? {
            config.health_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

/// Load project config (./.decksync.yaml).
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_project_config(project_dir: &Path) -> Result<ConfigLayer> {
    ConfigLayer::from_yaml(&project_dir.join(PROJECT_CONFIG_FILENAME))
}

/// Load user config (~/.config/decksync/config.yaml).
///
/// A missing `HOME` yields an empty layer.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<ConfigLayer> {
    let Ok(home) = env::var("HOME") else {
        return Ok(ConfigLayer::default());
    };
    let path = Path::new(&home)
        .join(".config")
        .join("decksync")
        .join("config.yaml");
    ConfigLayer::from_yaml(&path)
}

/// Default config layer (lowest precedence).
#[must_use]
pub fn default_config_layer() -> ConfigLayer {
    let mut layer = ConfigLayer::default();
    layer.insert("endpoint", DEFAULT_ENDPOINT.to_string());
    layer.insert("api-version", DEFAULT_API_VERSION.to_string());
    layer.insert("base-collection", DEFAULT_BASE_COLLECTION.to_string());
    layer.insert("failure-log", DEFAULT_FAILURE_LOG.to_string());
    layer
}

/// Load configuration with the standard precedence order.
///
/// # Errors
///
/// Returns an error if any config file cannot be read or parsed, or a value
/// is invalid.
pub fn load_config(project_dir: &Path, cli: &CliOverrides) -> Result<SyncConfig> {
    let merged = ConfigLayer::merge_layers(&[
        default_config_layer(),
        load_user_config()?,
        load_project_config(project_dir)?,
        ConfigLayer::from_env(),
        cli.as_layer(),
    ]);
    SyncConfig::from_layer(&merged)
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase().replace('_', "-")
}

fn parse_number<T: std::str::FromStr>(layer: &ConfigLayer, key: &str) -> Result<Option<T>> {
    match layer.get(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            SyncError::Config(format!("{key} must be a non-negative integer, got '{raw}'"))
        }),
    }
}

fn layer_from_yaml_value(value: &serde_yaml::Value) -> ConfigLayer {
    let mut layer = ConfigLayer::default();
    let mut flat = HashMap::new();
    flatten_yaml(value, "", &mut flat);

    for (key, value) in flat {
        layer.insert(&key, value);
    }

    layer
}

fn flatten_yaml(value: &serde_yaml::Value, prefix: &str, out: &mut HashMap<String, String>) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (key, value) in map {
                let Some(key_str) = key.as_str() else {
                    continue;
                };
                let next_prefix = if prefix.is_empty() {
                    key_str.to_string()
                } else {
                    format!("{prefix}.{key_str}")
                };
                flatten_yaml(value, &next_prefix, out);
            }
        }
        _ => {
            if let Some(value) = yaml_scalar_to_string(value) {
                out.insert(prefix.to_string(), value);
            }
        }
    }
}

fn yaml_scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Bool(v) => Some(v.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Null
        | serde_yaml::Value::Sequence(_)
        | serde_yaml::Value::Mapping(_) => None,
        serde_yaml::Value::Tagged(tagged) => yaml_scalar_to_string(&tagged.value),
    }
}
