//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};

use merit_crypto::keypair_from_seed;
use merit_types::{ChainParams, KeyPair, NetworkId};

use crate::logging::LogFormat;
use crate::NodeError;

/// Configuration for a Merit node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Which network to run.
    #[serde(default = "default_network")]
    pub network: NetworkId,

    /// Chain parameters. When absent they follow from `network`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain: Option<ChainParams>,

    /// Number of threads for the proof search.
    #[serde(default = "default_work_threads")]
    pub work_threads: usize,

    /// Log format: "human" or "json".
    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Hex-encoded 32-byte seed for the local validator key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validator_seed: Option<String>,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_network() -> NetworkId {
    NetworkId::dev()
}

fn default_work_threads() -> usize {
    1
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// The chain parameters in force: the explicit table if present,
    /// otherwise the defaults for `network`.
    pub fn chain_params(&self) -> ChainParams {
        if let Some(chain) = &self.chain {
            return chain.clone();
        }
        if self.network == NetworkId::test() {
            return ChainParams::test_defaults();
        }
        ChainParams {
            network_id: self.network.clone(),
            ..ChainParams::dev_defaults()
        }
    }

    /// The local validator key, if a seed is configured.
    pub fn validator_keypair(&self) -> Result<Option<KeyPair>, NodeError> {
        let Some(seed) = &self.validator_seed else {
            return Ok(None);
        };
        let bytes = hex::decode(seed).map_err(|e| NodeError::Config(format!("validator_seed: {e}")))?;
        let seed: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
            NodeError::Config(format!("validator_seed must be 32 bytes, got {}", b.len()))
        })?;
        Ok(Some(keypair_from_seed(&seed)?))
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            network: default_network(),
            chain: None,
            work_threads: default_work_threads(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            validator_seed: None,
        }
    }
}
