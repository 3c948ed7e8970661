//! Proof-of-work difficulty.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::DecodeError;
use crate::hash::Hash;

/// A 256-bit big-endian difficulty threshold.
///
/// A header hash meets the difficulty when, read as a big-endian unsigned
/// integer, it is greater than or equal to the threshold. Raising the
/// threshold makes valid hashes rarer.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Difficulty([u8; 32]);

impl Difficulty {
    /// Every hash meets this difficulty.
    pub const ZERO: Self = Self([0u8; 32]);
    /// Only the all-ones hash meets this difficulty.
    pub const MAX: Self = Self([0xFF; 32]);

    pub fn from_be_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn to_be_bytes(&self) -> [u8; 32] {
        self.0
    }

    /// Whether `hash` satisfies this difficulty.
    ///
    /// Byte-wise comparison of equal-length big-endian arrays is integer
    /// comparison.
    pub fn is_met_by(&self, hash: &Hash) -> bool {
        hash.as_bytes() >= &self.0
    }
}

impl fmt::Debug for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Difficulty({})", hex::encode(self.0))
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for Difficulty {
    type Err = DecodeError;

    /// Parses a hex threshold. Shorter inputs are left-padded with zeros, so
    /// `"ff"` is the integer 255.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| DecodeError::InvalidHex)?;
        if bytes.len() > 32 {
            return Err(DecodeError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut out = [0u8; 32];
        out[32 - bytes.len()..].copy_from_slice(&bytes);
        Ok(Self(out))
    }
}

impl Serialize for Difficulty {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_string())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Difficulty {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            s.parse().map_err(serde::de::Error::custom)
        } else {
            <[u8; 32]>::deserialize(deserializer).map(Self)
        }
    }
}
