use crate::{
    constants::NONCE_RANGE, now_timestamp, pow::meets_difficulty, preimage_prefix, rehash, Block,
};
use rand::Rng;
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// The fields of a block that are fixed before the nonce search starts.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockTemplate {
    pub index: u64,
    pub previous_hash: String,
    pub timestamp: f64,
    pub data: String,
}

impl BlockTemplate {
    /// Template for the successor of `previous`.
    pub fn next(previous: &Block, data: impl Into<String>, timestamp: f64) -> Self {
        Self {
            index: previous.index + 1,
            previous_hash: previous.hash.clone(),
            timestamp,
            data: data.into(),
        }
    }

    pub fn hash_with(&self, nonce: u64) -> String {
        rehash(
            self.index,
            &self.previous_hash,
            self.timestamp,
            &self.data,
            nonce,
        )
    }

    /// Finish the block with a known nonce, computing its hash once.
    pub fn seal(self, nonce: u64) -> Block {
        let hash = self.hash_with(nonce);
        self.into_block(hash, nonce)
    }

    pub fn into_block(self, hash: String, nonce: u64) -> Block {
        Block {
            index: self.index,
            previous_hash: self.previous_hash,
            timestamp: self.timestamp,
            data: self.data,
            hash,
            nonce,
        }
    }
}

/// Draw random six-digit nonces in parallel until one yields a hash that
/// meets the difficulty. Blocks the calling thread and never gives up.
pub fn mine(index: u64, previous_hash: &str, timestamp: f64, data: &str) -> (String, u64) {
    let template = BlockTemplate {
        index,
        previous_hash: previous_hash.to_string(),
        timestamp,
        data: data.to_string(),
    };
    let never = AtomicBool::new(false);
    loop {
        if let Some(found) = search(&template, &never) {
            return found;
        }
    }
}

/// Same search as [`mine`], abandoned with `None` once `cancel` is raised.
pub fn mine_cancellable(template: &BlockTemplate, cancel: &AtomicBool) -> Option<(String, u64)> {
    search(template, cancel)
}

fn search(template: &BlockTemplate, cancel: &AtomicBool) -> Option<(String, u64)> {
    // Everything but the nonce is constant, so hash that prefix once.
    let mut base = Sha256::new();
    base.update(preimage_prefix(
        template.index,
        &template.previous_hash,
        template.timestamp,
        &template.data,
    ));

    rayon::iter::repeat(())
        .map_init(rand::thread_rng, |rng, ()| rng.gen_range(NONCE_RANGE))
        .find_map_any(|nonce| {
            if cancel.load(Ordering::Relaxed) {
                return Some(None);
            }
            let mut hasher = base.clone();
            hasher.update(nonce.to_string());
            let hash = hex::encode(hasher.finalize());
            meets_difficulty(&hash).then_some(Some((hash, nonce)))
        })
        .flatten()
}

/// Build and mine the successor of `previous` stamped with the current time.
pub fn generate_next_block(previous: &Block, data: impl Into<String>) -> Block {
    let template = BlockTemplate::next(previous, data, now_timestamp());
    let (hash, nonce) = mine(
        template.index,
        &template.previous_hash,
        template.timestamp,
        &template.data,
    );
    info!("Mined block {} with nonce {} and hash {}", template.index, nonce, hash);
    template.into_block(hash, nonce)
}
