use std::ops::RangeInclusive;

pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;

/// Number of leading `'0'` hex digits a mined hash must carry.
pub const POW_DIFFICULTY: usize = 3;

/// Six-digit nonces, matching `floor(random * 899999) + 100000`.
pub const NONCE_RANGE: RangeInclusive<u64> = 100_000..=999_998;

pub const GENESIS_PREVIOUS_HASH: &str = "0";
pub const GENESIS_TIMESTAMP: f64 = 1_465_154_705.0;
pub const GENESIS_DATA: &str = "-> toni 100 coins";
pub const GENESIS_HASH: &str = "4df43c5af7351f1476714e25be617b1ceab30f4bc48ec34c1b30e525478165a9";
pub const GENESIS_NONCE: u64 = 10_000;
