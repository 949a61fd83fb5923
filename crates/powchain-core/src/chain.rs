use crate::{
    error::ChainError,
    genesis_block,
    validation::{check_chain, check_new_block, validate_from, ValidityReport},
    Block,
};
use tracing::info;

/// The node's ordered chain. Always starts at genesis and never goes empty.
///
/// It only changes by a one-block [`Chain::append`] or a wholesale
/// [`Chain::replace_chain`]; both validate before touching anything.
#[derive(Clone, Debug, PartialEq)]
pub struct Chain {
    blocks: Vec<Block>,
}

impl Default for Chain {
    fn default() -> Self {
        Self {
            blocks: vec![genesis_block()],
        }
    }
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopt `blocks` as a chain if they form a valid one.
    pub fn from_blocks(blocks: Vec<Block>) -> Result<Self, ChainError> {
        check_chain(&blocks)?;
        Ok(Self { blocks })
    }

    pub fn latest(&self) -> &Block {
        // Non-empty by construction.
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Extend the chain by one block that must directly succeed the tip.
    pub fn append(&mut self, block: Block) -> Result<(), ChainError> {
        check_new_block(&block, self.latest())?;
        info!(index = block.index, hash = %block.hash, "block appended");
        self.blocks.push(block);
        Ok(())
    }

    /// Longest-valid-chain rule: adopt `candidate` only if it is a valid
    /// chain from genesis and strictly longer than ours.
    pub fn replace_chain(&mut self, candidate: Vec<Block>) -> Result<(), ChainError> {
        check_chain(&candidate)?;
        if candidate.len() <= self.blocks.len() {
            return Err(ChainError::NotLonger {
                candidate: candidate.len(),
                local: self.blocks.len(),
            });
        }
        info!(
            from = self.blocks.len(),
            to = candidate.len(),
            "replacing chain with received chain"
        );
        self.blocks = candidate;
        Ok(())
    }

    pub fn validate_from(&self, index: u64) -> ValidityReport {
        validate_from(&self.blocks, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::ValidationError,
        mine::BlockTemplate,
        test_support::{chain_of_len, extend_unmined, fixture_chain},
    };

    #[test]
    fn new_chain_holds_only_genesis() {
        let chain = Chain::new();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.latest(), &genesis_block());
        assert!(!chain.is_empty());
    }

    #[test]
    fn append_accepts_direct_successor() {
        let fixture = fixture_chain();
        let mut chain = Chain::new();
        for block in fixture.iter().skip(1).cloned() {
            chain.append(block).unwrap();
        }
        assert_eq!(chain.blocks(), fixture.as_slice());
        assert_eq!(chain.latest().index, 5);
    }

    #[test]
    fn append_rejects_non_successor_and_leaves_chain() {
        let fixture = fixture_chain();
        let mut chain = Chain::new();
        let err = chain.append(fixture[2].clone()).unwrap_err();
        assert!(matches!(
            err,
            ChainError::Invalid(ValidationError::InvalidIndex { .. })
        ));
        assert_eq!(chain, Chain::new());
    }

    #[test]
    fn append_rejects_bad_hash() {
        let mut block = BlockTemplate::next(&genesis_block(), "x", 5.0).seal(100_000);
        block.hash = "000abc".to_string();
        let mut chain = Chain::new();
        assert!(chain.append(block).is_err());
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn from_blocks_rejects_invalid_chain() {
        let mut blocks = fixture_chain();
        blocks[1].data = "forged".to_string();
        assert!(Chain::from_blocks(blocks).is_err());
        assert!(Chain::from_blocks(fixture_chain()).is_ok());
    }

    #[test]
    fn replace_rejects_shorter_or_equal_valid_chain() {
        let mut chain = Chain::from_blocks(chain_of_len(4, "local")).unwrap();
        let before = chain.clone();

        let equal = chain_of_len(4, "remote");
        assert_eq!(
            chain.replace_chain(equal),
            Err(ChainError::NotLonger {
                candidate: 4,
                local: 4
            })
        );
        let shorter = chain_of_len(2, "remote");
        assert!(chain.replace_chain(shorter).is_err());
        assert_eq!(chain, before);
    }

    #[test]
    fn replace_rejects_longer_chain_with_broken_link() {
        let mut chain = Chain::from_blocks(chain_of_len(3, "local")).unwrap();
        let before = chain.clone();

        // Valid through index 3, broken at index 4.
        let mut candidate = chain_of_len(5, "remote");
        let mut tail = vec![candidate.pop().unwrap()];
        tail[0].previous_hash = "0".repeat(64);
        tail[0].hash = tail[0].calculate_hash();
        candidate.append(&mut tail);
        extend_unmined(&mut candidate, 2, "remote");

        assert_eq!(candidate.len(), 7);
        assert!(chain.replace_chain(candidate).is_err());
        assert_eq!(chain, before);
    }

    #[test]
    fn replace_adopts_strictly_longer_valid_chain() {
        let mut chain = Chain::from_blocks(chain_of_len(3, "local")).unwrap();
        let candidate = chain_of_len(5, "remote");
        chain.replace_chain(candidate.clone()).unwrap();
        assert_eq!(chain.blocks(), candidate.as_slice());
        assert_eq!(chain.latest().index, 4);
    }

    #[test]
    fn replace_rejects_chain_with_foreign_genesis() {
        let mut chain = Chain::new();
        let mut candidate = chain_of_len(3, "remote");
        candidate[0].data = "other genesis".to_string();
        assert_eq!(
            chain.replace_chain(candidate),
            Err(ChainError::Invalid(ValidationError::GenesisMismatch))
        );
    }
}
