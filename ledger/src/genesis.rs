//! Genesis block creation.
//!
//! The genesis block is never mined. Its previous hash is derived from the
//! network id, so every network starts from a distinct, deterministic block.

use merit_crypto::hash_parts;
use merit_types::{ChainParams, Hash, NetworkId, Signature};

use crate::{Block, BlockBody, BlockHeader};

/// The `previous_hash` a network's genesis header points at.
pub fn genesis_seed(network: &NetworkId) -> Hash {
    hash_parts(&[network.as_bytes()])
}

/// Build the genesis block for `params`.
pub fn genesis_block(params: &ChainParams) -> Block {
    let header = BlockHeader::new(
        0,
        genesis_seed(&params.network_id),
        params.genesis_time,
        Signature::default(),
    );
    Block::new(header, BlockBody::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_is_deterministic() {
        let params = ChainParams::dev_defaults();
        assert_eq!(genesis_block(&params), genesis_block(&params));
    }

    #[test]
    fn genesis_differs_per_network() {
        let dev = genesis_block(&ChainParams::dev_defaults());
        let mut params = ChainParams::dev_defaults();
        params.network_id = NetworkId::test();
        assert_ne!(dev.hash(), genesis_block(&params).hash());
    }

    #[test]
    fn genesis_shape() {
        let block = genesis_block(&ChainParams::dev_defaults());
        assert_eq!(block.height(), 0);
        assert_eq!(block.header.proof(), 0);
        assert!(block.header.aggregate().is_empty());
        assert!(block.body.is_empty());
        assert!(!block.hash().is_zero());
    }
}
