//! YAML configuration loading and persistence.
//!
//! The typed [`Config`] struct is the view every component receives at
//! construction time. The [`ConfigStore`] additionally keeps the raw YAML
//! tree so dotted-path `get`/`set` (for `shellai config --set`) can touch
//! keys the typed view does not know about, and so unknown keys in a user's
//! file survive a save.
//!
//! On first run the defaults are written out verbatim, giving manual edits a
//! known starting point. A present file is merged over the defaults leaf by
//! leaf (the file wins); an unreadable file falls back to defaults with a
//! warning rather than aborting.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub system_info: SystemInfoConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OllamaConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub default_model: String,
    /// Request timeout in seconds for generate/embed calls.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            default_model: default_model(),
            request_timeout: default_request_timeout(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_model")]
    pub model: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SystemInfoConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Subdirectory of `output_dir` holding the persisted index.
    #[serde(default = "default_storage_dir")]
    pub storage_dir: String,
}

impl Default for SystemInfoConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            storage_dir: default_storage_dir(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_model() -> String {
    "mistral".to_string()
}
fn default_request_timeout() -> u64 {
    60
}
fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("system_info")
}
fn default_storage_dir() -> String {
    "storage".to_string()
}

impl Config {
    /// Directory holding the persisted index companion files.
    pub fn storage_path(&self) -> PathBuf {
        self.system_info
            .output_dir
            .join(&self.system_info.storage_dir)
    }
}

/// Configuration file handle: typed view plus the raw YAML tree.
pub struct ConfigStore {
    path: PathBuf,
    raw: Value,
}

impl ConfigStore {
    /// Load configuration from `path`, creating a default file if absent.
    pub fn load(path: &Path) -> Result<Self> {
        let mut store = Self {
            path: path.to_path_buf(),
            raw: default_tree()?,
        };

        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match serde_yaml::from_str::<Value>(&content) {
                    Ok(user) => merge_values(&mut store.raw, user),
                    Err(e) => {
                        eprintln!(
                            "Warning: failed to parse config {}: {}. Using defaults.",
                            path.display(),
                            e
                        );
                    }
                },
                Err(e) => {
                    eprintln!(
                        "Warning: failed to read config {}: {}. Using defaults.",
                        path.display(),
                        e
                    );
                }
            }
        } else {
            store.save()?;
            println!("Created default configuration file: {}", path.display());
        }

        Ok(store)
    }

    /// The strongly typed view of the merged configuration.
    pub fn typed(&self) -> Result<Config> {
        let config: Config = serde_yaml::from_value(self.raw.clone())
            .with_context(|| format!("Invalid configuration in {}", self.path.display()))?;

        if config.ollama.base_url.trim().is_empty() {
            anyhow::bail!("ollama.base_url must not be empty");
        }
        if config.ollama.request_timeout == 0 {
            anyhow::bail!("ollama.request_timeout must be > 0");
        }
        if config.system_info.storage_dir.trim().is_empty() {
            anyhow::bail!("system_info.storage_dir must not be empty");
        }

        Ok(config)
    }

    /// Look up a value by dotted path, e.g. `ollama.base_url`.
    pub fn get(&self, key_path: &str) -> Option<&Value> {
        let mut current = &self.raw;
        for key in key_path.split('.') {
            current = current.as_mapping()?.get(Value::from(key))?;
        }
        Some(current)
    }

    /// Set a value by dotted path, creating intermediate mappings as needed.
    pub fn set(&mut self, key_path: &str, value: Value) {
        let keys: Vec<&str> = key_path.split('.').collect();
        let mut current = &mut self.raw;

        for key in &keys[..keys.len() - 1] {
            if !current.is_mapping() {
                *current = Value::Mapping(Default::default());
            }
            let map = current.as_mapping_mut().unwrap();
            let entry_key = Value::from(*key);
            if !map.contains_key(&entry_key) {
                map.insert(entry_key.clone(), Value::Mapping(Default::default()));
            }
            current = map.get_mut(&entry_key).unwrap();
        }

        if !current.is_mapping() {
            *current = Value::Mapping(Default::default());
        }
        current
            .as_mapping_mut()
            .unwrap()
            .insert(Value::from(keys[keys.len() - 1]), value);
    }

    /// Write the current tree back to the config file.
    pub fn save(&self) -> Result<()> {
        let content = serde_yaml::to_string(&self.raw)?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write config file: {}", self.path.display()))?;
        Ok(())
    }

    /// Re-read the file from disk, discarding unsaved changes.
    pub fn reload(&mut self) -> Result<()> {
        *self = Self::load(&self.path)?;
        Ok(())
    }

    /// Replace the tree with the defaults (does not save).
    pub fn reset(&mut self) -> Result<()> {
        self.raw = default_tree()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

fn default_tree() -> Result<Value> {
    Ok(serde_yaml::to_value(Config::default())?)
}

/// Recursively merge `user` into `default`: mappings merge per key,
/// everything else is replaced by the user value.
fn merge_values(default: &mut Value, user: Value) {
    match (default, user) {
        (Value::Mapping(default_map), Value::Mapping(user_map)) => {
            for (key, user_value) in user_map {
                match default_map.get_mut(&key) {
                    Some(default_value) => merge_values(default_value, user_value),
                    None => {
                        default_map.insert(key, user_value);
                    }
                }
            }
        }
        (default, user) => *default = user,
    }
}

/// Parse a `--set key=value` argument into a dotted path and a YAML scalar.
/// Values that parse as numbers or booleans are stored as such.
pub fn parse_set_arg(arg: &str) -> Result<(String, Value)> {
    let (key, raw) = arg
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("Invalid --set argument '{}': expected key=value", arg))?;
    if key.trim().is_empty() {
        anyhow::bail!("Invalid --set argument '{}': empty key", arg);
    }

    let value = serde_yaml::from_str::<Value>(raw).unwrap_or_else(|_| Value::from(raw));
    // YAML parses an empty string as null; keep it a string.
    let value = if value.is_null() {
        Value::from(raw)
    } else {
        value
    };

    Ok((key.trim().to_string(), value))
}

/// Run the `config` subcommand.
pub fn run_config(store: &mut ConfigStore, show: bool, reset: bool, sets: &[String]) -> Result<()> {
    if reset {
        store.reset()?;
        store.save()?;
        println!("Configuration reset to defaults: {}", store.path().display());
    }

    let mut changed = false;
    for arg in sets {
        let (key, value) = parse_set_arg(arg)?;
        store.set(&key, value);
        println!("Set {}", key);
        changed = true;
    }
    if changed {
        store.save()?;
        println!("Saved {}", store.path().display());
    }

    if show || (!reset && sets.is_empty()) {
        println!("# {}", store.path().display());
        print!("{}", serde_yaml::to_string(store.raw())?);
    }

    Ok(())
}
