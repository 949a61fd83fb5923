pub mod chain;
pub mod constants;
pub mod error;
pub mod message;
pub mod mine;
pub mod sync;
pub mod validation;

use constants::{GENESIS_DATA, GENESIS_HASH, GENESIS_NONCE, GENESIS_PREVIOUS_HASH, GENESIS_TIMESTAMP};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

pub use chain::Chain;
pub use error::{ChainError, ProtocolDecodeError, ValidationError};
pub use message::Message;
pub use mine::{generate_next_block, BlockTemplate};
pub use sync::SyncOutcome;
pub use validation::{is_valid_chain, is_valid_new_block, validate_from, ValidityReport};

/// A block as it travels on the wire and sits in the chain.
///
/// Field order matters: it is the JSON order peers expect.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub index: u64,
    pub previous_hash: String,
    pub timestamp: f64,
    pub data: String,
    pub hash: String,
    pub nonce: u64,
}

impl Block {
    /// Recompute the digest from the stored fields and nonce.
    pub fn calculate_hash(&self) -> String {
        rehash(
            self.index,
            &self.previous_hash,
            self.timestamp,
            &self.data,
            self.nonce,
        )
    }

    pub fn has_valid_hash(&self) -> bool {
        self.calculate_hash() == self.hash
    }
}

/// Text fed to the digest: the five fields rendered and concatenated with no
/// separator.
pub fn hash_preimage(
    index: u64,
    previous_hash: &str,
    timestamp: f64,
    data: &str,
    nonce: u64,
) -> String {
    let mut preimage = preimage_prefix(index, previous_hash, timestamp, data);
    preimage.push_str(&nonce.to_string());
    preimage
}

/// Everything before the nonce. The timestamp is rendered the way
/// JavaScript's `Number#toString` does, exponent forms included, so peers
/// written in JavaScript hash the same bytes.
pub(crate) fn preimage_prefix(
    index: u64,
    previous_hash: &str,
    timestamp: f64,
    data: &str,
) -> String {
    let mut number = ryu_js::Buffer::new();
    format!("{index}{previous_hash}{}{data}", number.format(timestamp))
}

/// Single deterministic digest over the block fields. No search.
pub fn rehash(index: u64, previous_hash: &str, timestamp: f64, data: &str, nonce: u64) -> String {
    let digest = Sha256::digest(hash_preimage(index, previous_hash, timestamp, data, nonce));
    hex::encode(digest)
}

/// The fixed first block every valid chain starts with.
pub fn genesis_block() -> Block {
    Block {
        index: 0,
        previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
        timestamp: GENESIS_TIMESTAMP,
        data: GENESIS_DATA.to_string(),
        hash: GENESIS_HASH.to_string(),
        nonce: GENESIS_NONCE,
    }
}

/// Wall-clock epoch seconds at millisecond resolution.
pub fn now_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as f64 / 1000.0)
        .unwrap_or_default()
}

pub mod pow {
    use crate::constants::POW_DIFFICULTY;

    pub fn count_leading_zero_digits(hash: &str) -> usize {
        hash.bytes().take_while(|b| *b == b'0').count()
    }

    /// True when `hash` starts with `POW_DIFFICULTY` zero hex digits.
    pub fn meets_difficulty(hash: &str) -> bool {
        count_leading_zero_digits(hash) >= POW_DIFFICULTY
    }
}
