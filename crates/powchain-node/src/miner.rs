use crate::{
    constants::{HEARTBEAT_DATA, HEARTBEAT_INTERVAL_SECS},
    error::NodeError,
    node::{MiningJob, NodeHandle},
};
use powchain_core::{mine::mine_cancellable, Block, ChainError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum MineOutcome {
    /// Appended to the chain and announced to peers.
    Mined(Block),
    /// The tip moved while searching; the work was dropped.
    Abandoned,
    /// Found a nonce, but the block no longer extends the tip.
    Rejected(ChainError),
}

/// Mine `data` on top of the current tip. The nonce search runs on the
/// blocking pool; the result goes back through the node actor.
///
/// The job runs on its own task, so a found block is still submitted when
/// the caller stops waiting.
pub async fn mine_next(node: &NodeHandle, data: String) -> Result<MineOutcome, NodeError> {
    let node = node.clone();
    tokio::spawn(async move { run_job(&node, data).await }).await?
}

async fn run_job(node: &NodeHandle, data: String) -> Result<MineOutcome, NodeError> {
    let MiningJob {
        id,
        template,
        cancel,
    } = node.prepare_mining(data).await?;

    let search = template.clone();
    let found = tokio::task::spawn_blocking(move || mine_cancellable(&search, &cancel)).await?;
    let Some((hash, nonce)) = found else {
        info!(job = id, index = template.index, "mining abandoned, chain advanced");
        return Ok(MineOutcome::Abandoned);
    };
    info!(
        "Mined block {} with nonce {} and hash {}",
        template.index, nonce, hash
    );

    let block = template.into_block(hash, nonce);
    Ok(match node.submit_mined(id, block.clone()).await? {
        Ok(()) => MineOutcome::Mined(block),
        Err(e) => MineOutcome::Rejected(e),
    })
}

/// Mine a health-status block at a fixed interval until the task is dropped.
pub fn spawn_heartbeat(node: NodeHandle) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(HEARTBEAT_INTERVAL_SECS));
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match mine_next(&node, HEARTBEAT_DATA.to_string()).await {
                Ok(MineOutcome::Mined(block)) => info!(index = block.index, "heartbeat block added"),
                Ok(other) => warn!("heartbeat block not added: {other:?}"),
                Err(e) => {
                    warn!("heartbeat stopped: {e}");
                    break;
                }
            }
        }
    })
}
