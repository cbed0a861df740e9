//! Configuration management for the Stakeline reconciler.
//!
//! Configuration is read from a TOML file (path in `STAKELINE_CONFIG`),
//! falls back to documented defaults for anything omitted, and accepts a
//! small set of environment overrides for deployment secrets and endpoints.

use crate::error::{CoreError, Result};
use crate::mission_type::MissionTypeRegistry;
use serde::{Deserialize, Serialize};
#[cfg(feature = "toml")]
use std::path::Path;
use std::time::Duration;

/// Environment variable naming the configuration file
pub const CONFIG_PATH_ENV: &str = "STAKELINE_CONFIG";

/// Reward written back when a cancellation is rolled back for resubmission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelGiveUpReward {
    /// Reset the mission's reward to its type's nominal reward
    RestoreNominal,
    /// Leave the accrued cancellation reward in place
    KeepAccrued,
}

/// Reconciliation loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Delay between the end of one pass and the start of the next
    #[serde(default = "default_cadence_ms")]
    pub cadence_ms: u64,
    /// Consecutive confirmation misses before a mission is rolled back
    #[serde(default = "default_retry_bound")]
    pub retry_bound: u32,
    /// Ledger calls allowed in flight at once within a phase
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
    #[serde(default = "default_cancel_give_up_reward")]
    pub cancel_give_up_reward: CancelGiveUpReward,
}

/// Mission store (GraphQL) connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_endpoint")]
    pub endpoint: String,
    /// Sent as `x-hasura-admin-secret`
    #[serde(default)]
    pub admin_secret: Option<String>,
    /// Primary key constraint used for `on_conflict` upserts
    #[serde(default = "default_upsert_constraint")]
    pub upsert_constraint: String,
    #[serde(default = "default_store_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// Ledger RPC and transfer service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// JSON-RPC endpoint used for transaction lookups
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Service that builds, signs and sends transfers
    #[serde(default = "default_transfer_service_url")]
    pub transfer_service_url: String,
    #[serde(default = "default_commitment")]
    pub commitment: String,
    #[serde(default = "default_ledger_timeout_ms")]
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON log lines instead of the human-readable format
    #[serde(default)]
    pub json: bool,
}

/// Top-level reconciler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub mission_types: MissionTypeRegistry,
}

fn default_cadence_ms() -> u64 {
    5_000
}

fn default_retry_bound() -> u32 {
    3
}

fn default_max_in_flight() -> usize {
    8
}

fn default_cancel_give_up_reward() -> CancelGiveUpReward {
    CancelGiveUpReward::RestoreNominal
}

fn default_store_endpoint() -> String {
    "http://127.0.0.1:8080/v1/graphql".to_string()
}

fn default_upsert_constraint() -> String {
    "missions_pkey".to_string()
}

fn default_store_timeout_ms() -> u64 {
    10_000
}

fn default_rpc_url() -> String {
    "http://127.0.0.1:8899".to_string()
}

fn default_transfer_service_url() -> String {
    "http://127.0.0.1:8090".to_string()
}

fn default_commitment() -> String {
    "confirmed".to_string()
}

fn default_ledger_timeout_ms() -> u64 {
    60_000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cadence_ms: default_cadence_ms(),
            retry_bound: default_retry_bound(),
            max_in_flight: default_max_in_flight(),
            cancel_give_up_reward: default_cancel_give_up_reward(),
        }
    }
}

impl EngineConfig {
    pub fn cadence(&self) -> Duration {
        Duration::from_millis(self.cadence_ms)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoint: default_store_endpoint(),
            admin_secret: None,
            upsert_constraint: default_upsert_constraint(),
            request_timeout_ms: default_store_timeout_ms(),
        }
    }
}

impl StoreConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            transfer_service_url: default_transfer_service_url(),
            commitment: default_commitment(),
            request_timeout_ms: default_ledger_timeout_ms(),
        }
    }
}

impl LedgerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            store: StoreConfig::default(),
            ledger: LedgerConfig::default(),
            logging: LoggingConfig::default(),
            mission_types: MissionTypeRegistry::default(),
        }
    }
}

impl ReconcilerConfig {
    /// Parse configuration from TOML text
    #[cfg(feature = "toml")]
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config = toml::from_str(content)?;
        Ok(config)
    }

    /// Read configuration from a TOML file
    #[cfg(feature = "toml")]
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load from `STAKELINE_CONFIG` if set, apply environment overrides and validate
    #[cfg(feature = "toml")]
    pub fn load() -> Result<Self> {
        let config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(path.trim())?,
            _ => Self::default(),
        };
        let config = config.with_runtime_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn with_runtime_overrides(self) -> Result<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    ///
    /// A variable that is set but cannot be parsed is an error.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(rpc_url) = non_empty("SOLANA_RPC_HOST") {
            self.ledger.rpc_url = rpc_url;
        }

        if let Some(url) = non_empty("TRANSFER_SERVICE_URL") {
            self.ledger.transfer_service_url = url;
        }

        if let Some(endpoint) = non_empty("HASURA_ENDPOINT") {
            self.store.endpoint = endpoint;
        }

        if let Some(secret) = non_empty("HASURA_SECRET") {
            self.store.admin_secret = Some(secret);
        }

        if let Some(cadence) = non_empty("STAKELINE_CADENCE_MS") {
            self.engine.cadence_ms = cadence.trim().parse::<u64>().map_err(|_| {
                CoreError::Validation(format!(
                    "STAKELINE_CADENCE_MS must be a whole number of milliseconds, got '{}'",
                    cadence
                ))
            })?;
        }

        if let Some(json) = non_empty("STAKELINE_LOG_JSON") {
            let lowered = json.to_ascii_lowercase();
            self.logging.json = matches!(lowered.as_str(), "1" | "true" | "yes" | "on");
        }

        Ok(self)
    }

    /// Reject configurations the reconciler cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.engine.cadence_ms == 0 {
            return Err(CoreError::Validation(
                "engine.cadence_ms must be greater than zero".to_string(),
            ));
        }

        if self.engine.retry_bound == 0 {
            return Err(CoreError::Validation(
                "engine.retry_bound must be at least 1".to_string(),
            ));
        }

        if self.engine.max_in_flight == 0 {
            return Err(CoreError::Validation(
                "engine.max_in_flight must be at least 1".to_string(),
            ));
        }

        for (name, url) in [
            ("store.endpoint", &self.store.endpoint),
            ("ledger.rpc_url", &self.ledger.rpc_url),
            ("ledger.transfer_service_url", &self.ledger.transfer_service_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(CoreError::Validation(format!(
                    "{} must be an http(s) URL, got '{}'",
                    name, url
                )));
            }
        }

        self.mission_types.validate()
    }
}
