use crate::{error::NodeError, peers::PeerRegistry};
use powchain_core::{
    now_timestamp, sync::handle_response, Block, BlockTemplate, Chain, ChainError, Message,
    SyncOutcome, ValidityReport,
};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Commands served by the node actor, one at a time.
#[derive(Debug)]
enum NodeCommand {
    Blocks {
        response: oneshot::Sender<Vec<Block>>,
    },
    Latest {
        response: oneshot::Sender<Block>,
    },
    Validate {
        index: u64,
        response: oneshot::Sender<ValidityReport>,
    },
    ApplyResponse {
        blocks: Vec<Block>,
        response: oneshot::Sender<SyncOutcome>,
    },
    PrepareMining {
        data: String,
        response: oneshot::Sender<MiningJob>,
    },
    SubmitMined {
        job: u64,
        block: Block,
        response: oneshot::Sender<Result<(), ChainError>>,
    },
}

/// A mining assignment against the tip as it was when the job was handed out.
#[derive(Debug, Clone)]
pub struct MiningJob {
    pub id: u64,
    pub template: BlockTemplate,
    /// Raised by the actor once the tip moves and this work is stale.
    pub cancel: Arc<AtomicBool>,
}

/// Owns the chain. Every read and write goes through its command queue, so
/// appends, replacements and mined-block submissions never interleave.
pub struct NodeInner {
    chain: Chain,
    peers: PeerRegistry,
    commands: mpsc::UnboundedReceiver<NodeCommand>,
    jobs: HashMap<u64, Arc<AtomicBool>>,
    next_job: u64,
}

impl NodeInner {
    /// Builds a new [`NodeInner`] alongside its corresponding [`NodeHandle`].
    pub fn new(chain: Chain, peers: PeerRegistry) -> (Self, NodeHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let inner = Self {
            chain,
            peers,
            commands: rx,
            jobs: HashMap::new(),
            next_job: 0,
        };
        (inner, NodeHandle { commands: tx })
    }

    /// Serve commands until every handle is dropped.
    pub async fn run(mut self) {
        while let Some(command) = self.commands.recv().await {
            self.handle_command(command);
        }
        debug!("node actor stopped");
    }

    fn handle_command(&mut self, command: NodeCommand) {
        match command {
            NodeCommand::Blocks { response } => {
                let _ = response.send(self.chain.blocks().to_vec());
            }
            NodeCommand::Latest { response } => {
                let _ = response.send(self.chain.latest().clone());
            }
            NodeCommand::Validate { index, response } => {
                let _ = response.send(self.chain.validate_from(index));
            }
            NodeCommand::ApplyResponse { blocks, response } => {
                let outcome = handle_response(&mut self.chain, blocks);
                if outcome.chain_changed() {
                    self.on_chain_changed();
                }
                let _ = response.send(outcome);
            }
            NodeCommand::PrepareMining { data, response } => {
                let id = self.next_job;
                self.next_job += 1;
                let cancel = Arc::new(AtomicBool::new(false));
                self.jobs.insert(id, cancel.clone());
                let template = BlockTemplate::next(self.chain.latest(), data, now_timestamp());
                debug!(job = id, index = template.index, "mining job prepared");
                let _ = response.send(MiningJob {
                    id,
                    template,
                    cancel,
                });
            }
            NodeCommand::SubmitMined {
                job,
                block,
                response,
            } => {
                self.jobs.remove(&job);
                let result = self.chain.append(block);
                match &result {
                    Ok(()) => self.on_chain_changed(),
                    Err(e) => warn!(job, "mined block rejected: {e}"),
                }
                let _ = response.send(result);
            }
        }
    }

    /// Announce the new tip and abandon mining work aimed at the old one.
    fn on_chain_changed(&mut self) {
        let latest = self.chain.latest().clone();
        for (job, cancel) in self.jobs.drain() {
            debug!(job, "abandoning stale mining job");
            cancel.store(true, Ordering::Relaxed);
        }
        match self.peers.broadcast(&Message::Response(vec![latest])) {
            Ok(count) => info!(
                index = self.chain.latest().index,
                peers = count,
                "broadcast new latest block"
            ),
            Err(e) => warn!("failed to broadcast latest block: {e}"),
        }
    }
}

/// Handle used to talk to the node actor.
#[derive(Clone, Debug)]
pub struct NodeHandle {
    commands: mpsc::UnboundedSender<NodeCommand>,
}

impl NodeHandle {
    /// Start an actor owning `chain` on the current tokio runtime.
    pub fn spawn(chain: Chain, peers: PeerRegistry) -> Self {
        let (inner, handle) = NodeInner::new(chain, peers);
        tokio::spawn(inner.run());
        handle
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> NodeCommand,
    ) -> Result<T, NodeError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(command(tx))
            .map_err(|_| NodeError::CommandChannelClosed)?;
        rx.await.map_err(|_| NodeError::CommandChannelClosed)
    }

    pub async fn blocks(&self) -> Result<Vec<Block>, NodeError> {
        self.request(|response| NodeCommand::Blocks { response })
            .await
    }

    pub async fn latest(&self) -> Result<Block, NodeError> {
        self.request(|response| NodeCommand::Latest { response })
            .await
    }

    pub async fn validate_from(&self, index: u64) -> Result<ValidityReport, NodeError> {
        self.request(|response| NodeCommand::Validate { index, response })
            .await
    }

    /// Run fork-choice on blocks a peer sent. Broadcasting an accepted update
    /// happens inside the actor.
    pub async fn apply_response(&self, blocks: Vec<Block>) -> Result<SyncOutcome, NodeError> {
        self.request(|response| NodeCommand::ApplyResponse { blocks, response })
            .await
    }

    pub async fn prepare_mining(&self, data: String) -> Result<MiningJob, NodeError> {
        self.request(|response| NodeCommand::PrepareMining { data, response })
            .await
    }

    /// Append a mined block; broadcast happens inside the actor on success.
    pub async fn submit_mined(
        &self,
        job: u64,
        block: Block,
    ) -> Result<Result<(), ChainError>, NodeError> {
        self.request(|response| NodeCommand::SubmitMined {
            job,
            block,
            response,
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use powchain_core::genesis_block;

    #[tokio::test]
    async fn fresh_node_serves_genesis() {
        let node = NodeHandle::spawn(Chain::new(), PeerRegistry::new());
        assert_eq!(node.blocks().await.unwrap(), vec![genesis_block()]);
        assert_eq!(node.latest().await.unwrap(), genesis_block());
        assert_eq!(node.validate_from(0).await.unwrap(), ValidityReport::Valid);
    }

    #[tokio::test]
    async fn prepared_job_targets_next_index() {
        let node = NodeHandle::spawn(Chain::new(), PeerRegistry::new());
        let job = node.prepare_mining("A".to_string()).await.unwrap();
        assert_eq!(job.template.index, 1);
        assert_eq!(job.template.previous_hash, genesis_block().hash);
        assert!(!job.cancel.load(Ordering::Relaxed));
    }

    #[tokio::test]
    async fn accepted_block_is_broadcast_and_cancels_other_jobs() {
        let peers = PeerRegistry::new();
        let (_peer, mut outbox) = peers.register("127.0.0.1:9");
        let node = NodeHandle::spawn(Chain::new(), peers);

        let first = node.prepare_mining("first".to_string()).await.unwrap();
        let second = node.prepare_mining("second".to_string()).await.unwrap();
        let block = first.template.clone().seal(123_456);
        node.submit_mined(first.id, block.clone()).await.unwrap().unwrap();

        assert!(second.cancel.load(Ordering::Relaxed));
        let frame = outbox.recv().await.unwrap();
        assert_eq!(
            Message::decode(&frame).unwrap(),
            Message::Response(vec![block])
        );
    }

    #[tokio::test]
    async fn stale_mined_block_is_rejected() {
        let node = NodeHandle::spawn(Chain::new(), PeerRegistry::new());
        let first = node.prepare_mining("first".to_string()).await.unwrap();
        let second = node.prepare_mining("second".to_string()).await.unwrap();
        node.submit_mined(first.id, first.template.seal(1))
            .await
            .unwrap()
            .unwrap();
        let late = node
            .submit_mined(second.id, second.template.seal(2))
            .await
            .unwrap();
        assert!(late.is_err());
        assert_eq!(node.blocks().await.unwrap().len(), 2);
    }
}
