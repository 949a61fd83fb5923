use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("node command channel closed")]
    CommandChannelClosed,
    #[error("mining worker failed: {0}")]
    MiningWorker(#[from] tokio::task::JoinError),
    #[error("transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}
