//! Node runtime: the chain actor, peer gossip over WebSockets, the mining
//! worker and the admin HTTP surface.

pub mod api;
pub mod config;
pub mod constants;
pub mod error;
pub mod gossip;
pub mod miner;
pub mod node;
pub mod p2p;
pub mod peers;

pub use error::NodeError;
pub use gossip::Gossip;
pub use node::NodeHandle;
pub use peers::{PeerId, PeerRegistry};
