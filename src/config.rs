//! Configuration management for playgloss

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub gloss: GlossConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Gloss pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlossConfig {
    /// Which backend to use ("claude", "codex")
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Merge threshold in source lines; <= 0 disables merging
    #[serde(default = "default_merge_threshold")]
    pub merge_threshold: i64,
    /// Timeout per chunk in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Retries after the first attempt
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Base backoff delay in seconds; doubles each retry
    #[serde(default = "default_base_delay_secs")]
    pub base_delay_secs: u64,
}

fn default_backend() -> String {
    "claude".to_string()
}

fn default_merge_threshold() -> i64 {
    42
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_retries() -> u32 {
    3
}

fn default_base_delay_secs() -> u64 {
    2
}

impl Default for GlossConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            merge_threshold: default_merge_threshold(),
            timeout_secs: default_timeout_secs(),
            retries: default_retries(),
            base_delay_secs: default_base_delay_secs(),
        }
    }
}

/// Cache database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_database")]
    pub database: String,
}

fn default_database() -> String {
    "~/.playgloss/glosses.db".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_directory")]
    pub directory: String,
}

fn default_output_directory() -> String {
    ".".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
        }
    }
}

impl Config {
    /// Get the config file path (~/.config/playgloss/config.toml)
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = Self::config_dir()?;
        Ok(config_dir.join("config.toml"))
    }

    /// Get the config directory path (~/.config/playgloss)
    pub fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".config").join("playgloss"))
    }

    /// Load configuration from file, or return defaults if not found
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let contents = fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file: {:?}", config_path))?;
            let config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        // Ensure config directory exists
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, contents)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        Ok(())
    }

    /// Expand ~ in the database path
    pub fn database_path(&self) -> PathBuf {
        expand_tilde(&self.store.database)
    }

    /// Expand ~ in the output directory path
    pub fn output_directory(&self) -> PathBuf {
        expand_tilde(&self.output.directory)
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
