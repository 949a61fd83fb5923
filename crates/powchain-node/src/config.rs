use crate::constants::{DEFAULT_HOST, DEFAULT_HTTP_PORT, DEFAULT_P2P_PORT};
use clap::Parser;

/// Node settings, read from flags with environment variable fallbacks.
#[derive(Parser, Debug, Clone)]
#[command(name = "powchain-node")]
#[command(about = "Proof-of-work chain node that syncs with peers over WebSocket gossip")]
pub struct Args {
    /// Interface the HTTP and p2p listeners bind to
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port for the admin HTTP API
    #[arg(long, env = "HTTP_PORT", default_value_t = DEFAULT_HTTP_PORT)]
    pub http_port: u16,

    /// Port for peer WebSocket connections
    #[arg(long, env = "P2P_PORT", default_value_t = DEFAULT_P2P_PORT)]
    pub p2p_port: u16,

    /// Comma separated peers to dial at startup, e.g. ws://127.0.0.1:6001
    #[arg(long, env = "PEERS", value_delimiter = ',')]
    pub peers: Vec<String>,
}

impl Args {
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.host, self.http_port)
    }

    pub fn p2p_addr(&self) -> String {
        format!("{}:{}", self.host, self.p2p_port)
    }

    /// Startup peers with blanks from stray commas dropped.
    pub fn peer_urls(&self) -> impl Iterator<Item = &str> {
        self.peers
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
    }
}
