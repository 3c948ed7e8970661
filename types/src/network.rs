//! Network identifier.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies which chain a block belongs to.
///
/// The bytes seed the genesis block, so two networks never share a chain.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkId(String);

impl NetworkId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The production network.
    pub fn live() -> Self {
        Self::new("MERIT_LIVE_NETWORK")
    }

    /// The public test network.
    pub fn test() -> Self {
        Self::new("MERIT_TEST_NETWORK")
    }

    /// Local development network.
    pub fn dev() -> Self {
        Self::new("MERIT_DEVELOPER_NETWORK")
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NetworkId({})", self.0)
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
