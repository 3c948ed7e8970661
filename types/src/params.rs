//! Chain parameters fixed at genesis.

use serde::{Deserialize, Serialize};

use crate::difficulty::Difficulty;
use crate::network::NetworkId;
use crate::time::Timestamp;

/// Parameters every node on a network must agree on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainParams {
    /// Which chain these parameters describe; seeds the genesis block.
    pub network_id: NetworkId,

    /// Intended seconds between blocks. Retargeting aims for
    /// `block_time_secs * retarget_period` seconds per period.
    pub block_time_secs: u64,

    /// Difficulty is recomputed whenever the chain height is a multiple of this.
    pub retarget_period: u64,

    /// Difficulty in force from genesis until the first retarget boundary.
    pub initial_difficulty: Difficulty,

    /// Timestamp embedded in the genesis header.
    pub genesis_time: Timestamp,
}

impl ChainParams {
    /// Local development chain: easy work, quick retargets.
    pub fn dev_defaults() -> Self {
        let mut initial = [0u8; 32];
        initial[0] = 0x80;
        Self {
            network_id: NetworkId::dev(),
            block_time_secs: 60,
            retarget_period: 100,
            initial_difficulty: Difficulty::from_be_bytes(initial),
            genesis_time: Timestamp::EPOCH,
        }
    }

    /// Public test network.
    pub fn test_defaults() -> Self {
        let mut initial = [0u8; 32];
        initial[0] = 0xFF;
        initial[1] = 0xF0;
        Self {
            network_id: NetworkId::test(),
            block_time_secs: 600,
            retarget_period: 144,
            initial_difficulty: Difficulty::from_be_bytes(initial),
            genesis_time: Timestamp::new(1_700_000_000),
        }
    }

    /// Target length in seconds of one retarget period.
    pub fn target_period_secs(&self) -> u64 {
        self.block_time_secs.saturating_mul(self.retarget_period)
    }
}

/// Default is the development configuration.
impl Default for ChainParams {
    fn default() -> Self {
        Self::dev_defaults()
    }
}
