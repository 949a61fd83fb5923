use clap::Parser;
use powchain_core::Chain;
use powchain_node::{
    api::{self, AppState},
    config::Args,
    p2p, Gossip, NodeHandle, PeerRegistry,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let peers = PeerRegistry::new();
    let node = NodeHandle::spawn(Chain::new(), peers.clone());
    let gossip = Gossip::new(node, peers);

    let (p2p_addr, _p2p) = p2p::listen(args.p2p_addr(), gossip.clone()).await?;
    for url in args.peer_urls() {
        info!("dialing initial peer {url}");
        p2p::spawn_connect(url.to_string(), gossip.clone());
    }

    let app = api::router(AppState::new(gossip));
    let listener = tokio::net::TcpListener::bind(args.http_addr()).await?;
    info!(
        "powchain-node listening on http://{} (p2p ws://{p2p_addr})",
        listener.local_addr()?
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutting down");
    }
}
