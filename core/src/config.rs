//! Configuration Module
//!
//! Handles loading configuration from:
//! 1. `$MURK_CONFIG`, `~/.murk/config.toml` or `./config.toml` (first found)
//! 2. Environment variables (override TOML values)
//!
//! Environment variables take precedence over TOML config.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::{env, fs};

use crate::pool::DEFAULT_SETTLEMENT_FEE;

const CONFIG_FILE_NAME: &str = "config.toml";
const CONFIG_DIR_NAME: &str = ".murk";

/// Root configuration structure (matches TOML layout)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MurkConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub relayer: RelayerConfig,
    #[serde(default)]
    pub operator: OperatorConfig,
    #[serde(default)]
    pub features: FeatureFlags,
}

/// API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_host")]
    pub host: String,
    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_api_host(),
            port: default_api_port(),
        }
    }
}

fn default_api_host() -> String {
    "127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
    /// Keep the ledger in memory only (nothing survives a restart)
    #[serde(default)]
    pub ephemeral: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            ephemeral: false,
        }
    }
}

fn default_db_path() -> String {
    "./murk-db".to_string()
}

/// Relayer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayerConfig {
    /// JSON seed file of the relayer key; relay endpoints answer 503 without it
    #[serde(default)]
    pub keypair_path: Option<String>,
    /// Lamports debited from the relayer per relayed settlement
    #[serde(default = "default_settlement_fee")]
    pub settlement_fee: u64,
}

impl Default for RelayerConfig {
    fn default() -> Self {
        Self {
            keypair_path: None,
            settlement_fee: default_settlement_fee(),
        }
    }
}

fn default_settlement_fee() -> u64 {
    DEFAULT_SETTLEMENT_FEE
}

/// Operator configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperatorConfig {
    /// Pool authority key, used to initialize a fresh pool
    #[serde(default)]
    pub authority_keypair_path: Option<String>,
}

/// Feature flags
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureFlags {
    /// Enable dev mode (airdrop endpoint)
    #[serde(default)]
    pub dev_mode: bool,
    /// Expose operator endpoints (batch claim, churn). Calls must still be
    /// signed by the pool authority.
    #[serde(default)]
    pub operator_api: bool,
}

impl MurkConfig {
    /// Load configuration from file with env var overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(config_path) = Self::find_config_file() {
            log::info!("Loading config from: {}", config_path.display());
            let contents = fs::read_to_string(&config_path).with_context(|| {
                format!("Failed to read config file: {}", config_path.display())
            })?;
            config = toml::from_str(&contents).with_context(|| {
                format!("Failed to parse config file: {}", config_path.display())
            })?;
        } else {
            log::info!("No config file found, using defaults and environment variables");
        }

        config.apply_env_overrides();
        Ok(config)
    }

    /// Find the config file path
    fn find_config_file() -> Option<PathBuf> {
        // 1. Check MURK_CONFIG env var
        if let Ok(path) = env::var("MURK_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // 2. Check ~/.murk/config.toml
        if let Some(config_path) = Self::default_config_path() {
            if config_path.exists() {
                return Some(config_path);
            }
        }

        // 3. Check ./config.toml (current directory)
        let local_path = PathBuf::from(CONFIG_FILE_NAME);
        if local_path.exists() {
            return Some(local_path);
        }

        None
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Applies overrides from `lookup` (the process environment in production).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Database
        if let Some(v) = lookup("MURK_DB_PATH") {
            self.database.path = v;
        }

        // API
        if let Some(v) = lookup("MURK_API_HOST") {
            self.api.host = v;
        }
        if let Some(port) = lookup("MURK_API_PORT").and_then(|v| v.parse().ok()) {
            self.api.port = port;
        }

        // Relayer
        if let Some(v) = lookup("MURK_RELAYER_KEYPAIR") {
            self.relayer.keypair_path = Some(v);
        }
        if let Some(fee) = lookup("MURK_SETTLEMENT_FEE").and_then(|v| v.parse().ok()) {
            self.relayer.settlement_fee = fee;
        }

        // Operator
        if let Some(v) = lookup("MURK_AUTHORITY_KEYPAIR") {
            self.operator.authority_keypair_path = Some(v);
        }

        // Features
        if let Some(v) = lookup("MURK_DEV_MODE") {
            self.features.dev_mode = is_truthy(&v);
        }
        if let Some(v) = lookup("MURK_OPERATOR_API") {
            self.features.operator_api = is_truthy(&v);
        }
    }

    /// Get the default config file path
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Generate a sample config file
    pub fn generate_sample() -> String {
        let sample = Self {
            api: ApiConfig::default(),
            database: DatabaseConfig::default(),
            relayer: RelayerConfig {
                keypair_path: Some("~/.murk/relayer.json".to_string()),
                settlement_fee: DEFAULT_SETTLEMENT_FEE,
            },
            operator: OperatorConfig {
                authority_keypair_path: Some("~/.murk/authority.json".to_string()),
            },
            features: FeatureFlags::default(),
        };

        toml::to_string_pretty(&sample).unwrap_or_default()
    }
}

/// Expands a leading `~/` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

fn is_truthy(v: &str) -> bool {
    v == "1" || v.eq_ignore_ascii_case("true")
}
