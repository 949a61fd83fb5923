use crate::{
    error::NodeError,
    node::NodeHandle,
    peers::{Outbox, PeerId, PeerRegistry},
};
use powchain_core::{Message, SyncOutcome};
use tracing::{debug, info};

/// Dispatches decoded peer messages to the node and replies on the same
/// connection. Transport-agnostic: connections hand it frames and ids.
#[derive(Clone)]
pub struct Gossip {
    node: NodeHandle,
    peers: PeerRegistry,
}

impl Gossip {
    pub fn new(node: NodeHandle, peers: PeerRegistry) -> Self {
        Self { node, peers }
    }

    pub fn node(&self) -> &NodeHandle {
        &self.node
    }

    pub fn peers(&self) -> &PeerRegistry {
        &self.peers
    }

    /// Register a freshly opened connection and queue the bootstrap
    /// `QUERY_LATEST` for it.
    pub fn on_connect(&self, addr: impl Into<String>) -> Result<(PeerId, Outbox), NodeError> {
        let addr = addr.into();
        let (peer, outbox) = self.peers.register(addr.clone());
        info!(%peer, %addr, "peer connected");
        self.peers.send(peer, &Message::QueryLatest)?;
        Ok((peer, outbox))
    }

    pub async fn on_message(&self, peer: PeerId, message: Message) -> Result<(), NodeError> {
        debug!(%peer, kind = message.kind(), "received message");
        match message {
            Message::QueryLatest => {
                let latest = self.node.latest().await?;
                self.peers.send(peer, &Message::Response(vec![latest]))?;
            }
            Message::QueryAll => {
                let blocks = self.node.blocks().await?;
                self.peers.send(peer, &Message::Response(blocks))?;
            }
            Message::Response(blocks) => {
                let outcome = self.node.apply_response(blocks).await?;
                debug!(%peer, ?outcome, "response applied");
                if outcome == SyncOutcome::QueryAll {
                    self.peers.send(peer, &Message::QueryAll)?;
                }
            }
        }
        Ok(())
    }

    /// Deregister a closed or failed connection. Safe to call twice.
    pub fn on_close(&self, peer: PeerId) {
        if self.peers.remove(peer) {
            info!(%peer, "peer disconnected");
        }
    }
}
