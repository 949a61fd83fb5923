use crate::{error::ValidationError, genesis_block, Block};
use tracing::debug;

/// Check `candidate` as the direct successor of `previous`. Stops at the
/// first failing check: index, then linkage, then hash integrity.
pub fn check_new_block(candidate: &Block, previous: &Block) -> Result<(), ValidationError> {
    let expected = previous.index + 1;
    if candidate.index != expected {
        return Err(ValidationError::InvalidIndex {
            expected,
            found: candidate.index,
        });
    }
    if candidate.previous_hash != previous.hash {
        return Err(ValidationError::InvalidPreviousHash {
            expected: previous.hash.clone(),
            found: candidate.previous_hash.clone(),
        });
    }
    let computed = candidate.calculate_hash();
    if computed != candidate.hash {
        return Err(ValidationError::InvalidHash {
            computed,
            stored: candidate.hash.clone(),
        });
    }
    Ok(())
}

pub fn is_valid_new_block(candidate: &Block, previous: &Block) -> bool {
    match check_new_block(candidate, previous) {
        Ok(()) => true,
        Err(e) => {
            debug!(index = candidate.index, "block rejected: {e}");
            false
        }
    }
}

/// Whole-chain check from genesis.
pub fn check_chain(chain: &[Block]) -> Result<(), ValidationError> {
    let first = chain.first().ok_or(ValidationError::EmptyChain)?;
    if *first != genesis_block() {
        return Err(ValidationError::GenesisMismatch);
    }
    chain
        .windows(2)
        .try_for_each(|pair| check_new_block(&pair[1], &pair[0]))
}

pub fn is_valid_chain(chain: &[Block]) -> bool {
    match check_chain(chain) {
        Ok(()) => true,
        Err(e) => {
            debug!(len = chain.len(), "chain rejected: {e}");
            false
        }
    }
}

/// Result of walking a stored chain backward from a given block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValidityReport {
    /// The start block and everything before it check out.
    Valid,
    /// No block with the requested index, or the start block itself fails.
    Invalid,
    /// The start block is fine but the walk broke at this index.
    BrokenAt(u64),
}

impl ValidityReport {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidityReport::Valid)
    }
}

/// Walk backward from the block whose index is `index` to genesis, checking
/// each block against its predecessor and the first block against genesis.
pub fn validate_from(chain: &[Block], index: u64) -> ValidityReport {
    let Some(start) = chain.iter().rposition(|b| b.index == index) else {
        return ValidityReport::Invalid;
    };

    let check = |i: usize| -> Result<(), ValidationError> {
        if i == 0 {
            if chain[0] == genesis_block() {
                Ok(())
            } else {
                Err(ValidationError::GenesisMismatch)
            }
        } else {
            check_new_block(&chain[i], &chain[i - 1])
        }
    };

    if let Err(e) = check(start) {
        debug!(index, "validation start block fails: {e}");
        return ValidityReport::Invalid;
    }
    for i in (0..start).rev() {
        if let Err(e) = check(i) {
            debug!(index = chain[i].index, "validation broke: {e}");
            return ValidityReport::BrokenAt(chain[i].index);
        }
    }
    ValidityReport::Valid
}
