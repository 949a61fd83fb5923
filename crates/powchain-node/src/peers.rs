use crate::error::NodeError;
use parking_lot::RwLock;
use powchain_core::Message;
use std::{
    collections::HashMap,
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};
use tokio::sync::mpsc;

/// Identity of one live connection. Two connections to the same address get
/// different ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(u64);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer-{}", self.0)
    }
}

/// Encoded frames waiting to be written to a peer.
pub type Outbox = mpsc::UnboundedReceiver<String>;

struct Peer {
    addr: String,
    outbox: mpsc::UnboundedSender<String>,
}

#[derive(Default)]
struct Inner {
    peers: RwLock<HashMap<PeerId, Peer>>,
    next_id: AtomicU64,
}

/// Live peer connections, shared between the transport, the gossip handler
/// and the node actor.
#[derive(Clone, Default)]
pub struct PeerRegistry {
    inner: Arc<Inner>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new connection. The returned outbox yields every frame queued
    /// for this peer until it is removed.
    pub fn register(&self, addr: impl Into<String>) -> (PeerId, Outbox) {
        let id = PeerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.peers.write().insert(
            id,
            Peer {
                addr: addr.into(),
                outbox: tx,
            },
        );
        (id, rx)
    }

    /// Forget a connection. Removing an unknown id is not an error.
    pub fn remove(&self, id: PeerId) -> bool {
        self.inner.peers.write().remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.inner.peers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.peers.read().is_empty()
    }

    pub fn addrs(&self) -> Vec<String> {
        self.inner
            .peers
            .read()
            .values()
            .map(|p| p.addr.clone())
            .collect()
    }

    /// Queue `message` for one peer. `Ok(false)` if that peer is gone.
    pub fn send(&self, id: PeerId, message: &Message) -> Result<bool, NodeError> {
        let frame = message.encode()?;
        Ok(self
            .inner
            .peers
            .read()
            .get(&id)
            .is_some_and(|p| p.outbox.send(frame).is_ok()))
    }

    /// Best-effort fan-out to every registered peer. A peer whose connection
    /// already went away is skipped; its own close path deregisters it.
    /// Returns how many peers the message was queued for.
    pub fn broadcast(&self, message: &Message) -> Result<usize, NodeError> {
        let frame = message.encode()?;
        Ok(self
            .inner
            .peers
            .read()
            .values()
            .filter(|p| p.outbox.send(frame.clone()).is_ok())
            .count())
    }
}
