//! Merit node runtime.
//!
//! Wires the chain and the consensus registry into a running process:
//! - [`config`]: TOML configuration.
//! - [`logging`]: tracing subscriber setup.
//! - [`engine`]: the single-writer context owning chain and registry.
//! - [`miner`]: background block production.
//! - [`shutdown`]: signal-driven shutdown flag.

pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod miner;
pub mod shutdown;

pub use config::NodeConfig;
pub use engine::Engine;
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use miner::Miner;
pub use shutdown::{ShutdownController, ShutdownSignal};

use merit_ledger::StateSnapshot;

/// Read a state record written by [`write_state`].
pub fn read_state(path: &std::path::Path) -> Result<StateSnapshot, NodeError> {
    let text = std::fs::read_to_string(path)?;
    let value: serde_json::Value =
        serde_json::from_str(&text).map_err(|e| NodeError::Snapshot(e.to_string()))?;
    Ok(StateSnapshot::from_json(&value)?)
}

/// Write a state record as pretty-printed JSON.
pub fn write_state(path: &std::path::Path, snapshot: &StateSnapshot) -> Result<(), NodeError> {
    let text = serde_json::to_string_pretty(&snapshot.to_json()?)
        .map_err(|e| NodeError::Snapshot(e.to_string()))?;
    std::fs::write(path, text)?;
    Ok(())
}
