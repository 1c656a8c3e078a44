//! Configuration for the reward engine.
//!
//! Values come from defaults, an optional YAML file and `EXPO_REWARDS__`
//! prefixed environment variables, in increasing priority.

use serde::Deserialize;

use crate::storage::StorageConfig;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "EXPO_REWARDS_CONFIG";
/// Prefix for environment overrides, e.g. `EXPO_REWARDS__GACHA__COST=50`.
pub const CONFIG_ENV_PREFIX: &str = "EXPO_REWARDS";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "EXPO_REWARDS_LOG";

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Points paid for booth activity.
    pub rewards: RewardsConfig,
    /// Gacha pricing, limits and retry policy.
    pub gacha: GachaConfig,
}

/// Points credited by booth activity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RewardsConfig {
    /// Points for the first check-in at a booth.
    pub visit_points: i64,
    /// Points for the first evaluation of a booth.
    pub evaluation_points: i64,
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self {
            visit_points: 10,
            evaluation_points: 10,
        }
    }
}

/// Gacha settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GachaConfig {
    /// Points one draw costs.
    pub cost: i64,
    /// Draws allowed per user.
    pub max_attempts: i64,
    /// Total tries for a draw that hits a write conflict, first try included.
    pub conflict_attempts: usize,
    /// Initial delay between conflict retries.
    pub backoff_min_ms: u64,
    /// Ceiling on the delay between conflict retries.
    pub backoff_max_ms: u64,
    /// Fixed RNG seed. Unset draws from OS entropy.
    pub seed: Option<u64>,
}

impl Default for GachaConfig {
    fn default() -> Self {
        Self {
            cost: 40,
            max_attempts: 2,
            conflict_attempts: 3,
            backoff_min_ms: 10,
            backoff_max_ms: 200,
            seed: None,
        }
    }
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `config.yaml` in current directory (if exists)
    /// 2. File specified by `path` argument (if provided)
    /// 3. File specified by `CONFIG_ENV_VAR` environment variable (if set)
    /// 4. Environment variables with `CONFIG_ENV_PREFIX` prefix
    pub fn load(path: Option<&str>) -> Result<Self, ::config::ConfigError> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Create config for testing: in-memory storage and a seeded gacha.
    pub fn for_test() -> Self {
        Self {
            storage: StorageConfig::in_memory(),
            rewards: RewardsConfig::default(),
            gacha: GachaConfig {
                seed: Some(42),
                ..GachaConfig::default()
            },
        }
    }
}
