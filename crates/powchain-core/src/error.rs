use thiserror::Error;

/// The check that rejected a block. Reported for logging only; callers see a
/// plain accept/reject.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid index: expected {expected}, found {found}")]
    InvalidIndex { expected: u64, found: u64 },
    #[error("invalid previous hash: expected {expected}, found {found}")]
    InvalidPreviousHash { expected: String, found: String },
    #[error("invalid hash: computed {computed}, stored {stored}")]
    InvalidHash { computed: String, stored: String },
    #[error("first block is not the canonical genesis block")]
    GenesisMismatch,
    #[error("chain is empty")]
    EmptyChain,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("candidate chain of length {candidate} is not longer than local length {local}")]
    NotLonger { candidate: usize, local: usize },
}

/// A frame that does not decode into a [`crate::Message`].
#[derive(Debug, Error)]
pub enum ProtocolDecodeError {
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown message type {0}")]
    UnknownType(u8),
    #[error("response message without a data field")]
    MissingData,
    #[error("response message carries no blocks")]
    EmptyResponse,
}
