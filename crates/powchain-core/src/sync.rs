use crate::{chain::Chain, error::ChainError, Block};
use tracing::{debug, info, warn};

/// What applying a peer's response did to the local chain.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// The peer is not ahead of us.
    Ignored,
    /// The single received block extended our tip.
    Appended,
    /// A single block we cannot link; ask that peer for its whole chain.
    QueryAll,
    /// A longer valid chain replaced ours.
    Replaced,
    /// The received block or chain failed validation or the length rule.
    Rejected(ChainError),
}

impl SyncOutcome {
    /// Whether the local tip moved and peers should hear about it.
    pub fn chain_changed(&self) -> bool {
        matches!(self, SyncOutcome::Appended | SyncOutcome::Replaced)
    }
}

/// Fork-choice: decide how the blocks a peer sent relate to our chain and
/// apply the result.
pub fn handle_response(chain: &mut Chain, mut received: Vec<Block>) -> SyncOutcome {
    received.sort_by_key(|b| b.index);
    let Some(tail) = received.last() else {
        return SyncOutcome::Ignored;
    };
    let local = chain.latest();

    if tail.index <= local.index {
        debug!(
            local = local.index,
            received = tail.index,
            "received chain is not longer than ours, nothing to do"
        );
        return SyncOutcome::Ignored;
    }
    info!(
        local = local.index,
        received = tail.index,
        "chain possibly behind"
    );

    if received.len() == 1 {
        let candidate = received.remove(0);
        if candidate.previous_hash == local.hash && candidate.index == local.index + 1 {
            return match chain.append(candidate) {
                Ok(()) => SyncOutcome::Appended,
                Err(e) => {
                    warn!("received block rejected: {e}");
                    SyncOutcome::Rejected(e)
                }
            };
        }
        debug!("single block does not link to our tip, querying full chain");
        return SyncOutcome::QueryAll;
    }

    match chain.replace_chain(received) {
        Ok(()) => SyncOutcome::Replaced,
        Err(e) => {
            warn!("received chain rejected: {e}");
            SyncOutcome::Rejected(e)
        }
    }
}
