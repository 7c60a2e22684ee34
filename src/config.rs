// 7.0 config.rs: all module settings in one place. fee index, hook behaviour, limits.
// 7.1 loading layers defaults, an optional leverage.toml and LEVERAGE__* env vars.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name the debt-issuance orchestrator is registered under in the integration registry.
pub const DEFAULT_ISSUANCE_MODULE_NAME: &str = "DefaultIssuanceModule";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleConfig {
    // Maximum number of events to retain in memory
    pub max_events: usize,
    // Controller fee index charged on trade output
    pub protocol_fee_index: usize,
    // Upper bound on the controller fee this module will honour
    pub max_protocol_fee_bps: u32,
    // Integration registry name of the debt-issuance orchestrator
    pub issuance_module_name: String,
    // Run a sync inside component hooks instead of deferring it to the caller
    pub sync_on_component_hook: bool,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            max_events: 100_000,
            protocol_fee_index: 0,
            max_protocol_fee_bps: 500, // 5%
            issuance_module_name: DEFAULT_ISSUANCE_MODULE_NAME.to_string(),
            sync_on_component_hook: false,
        }
    }
}

impl ModuleConfig {
    // Preset with strict consistency: hooks resync positions themselves
    pub fn production() -> Self {
        Self {
            sync_on_component_hook: true,
            max_protocol_fee_bps: 100, // 1%
            ..Self::default()
        }
    }

    /// Defaults, then `<dir>/leverage.toml`, then `LEVERAGE__*` environment variables.
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let settings = ::config::Config::builder()
            .add_source(::config::File::from(config_dir.join("leverage.toml")).required(false))
            .add_source(
                ::config::Environment::with_prefix("LEVERAGE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigError::Load(e.to_string()))?;

        let loaded: ModuleConfig = settings
            .try_deserialize()
            .map_err(|e| ConfigError::Load(e.to_string()))?;
        loaded.validate()?;
        Ok(loaded)
    }

    // Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_events == 0 {
            return Err(ConfigError::InvalidLimit {
                reason: "Event buffer must hold at least one event".to_string(),
            });
        }

        if self.max_protocol_fee_bps > 10_000 {
            return Err(ConfigError::InvalidFees {
                reason: "Fee cap above 100%".to_string(),
            });
        }

        if self.issuance_module_name.trim().is_empty() {
            return Err(ConfigError::InvalidIntegration {
                reason: "Issuance module name is empty".to_string(),
            });
        }

        Ok(())
    }
}

// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid limit: {reason}")]
    InvalidLimit { reason: String },

    #[error("Invalid fees: {reason}")]
    InvalidFees { reason: String },

    #[error("Invalid integration: {reason}")]
    InvalidIntegration { reason: String },

    #[error("Failed to load configuration: {0}")]
    Load(String),
}

// Environment presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn config(&self) -> ModuleConfig {
        match self {
            Environment::Development => ModuleConfig::default(),
            Environment::Production => ModuleConfig::production(),
        }
    }
}
