use futures_util::{SinkExt, StreamExt};
use powchain_core::{Chain, Message};
use powchain_node::{miner::mine_next, miner::MineOutcome, p2p, Gossip, NodeHandle, PeerRegistry};
use std::{future::Future, net::SocketAddr, time::Duration};
use tokio::time::{sleep, timeout};
use tokio_tungstenite::{connect_async, tungstenite::Message as Frame};

fn spawn_node() -> Gossip {
    let peers = PeerRegistry::new();
    Gossip::new(NodeHandle::spawn(Chain::new(), peers.clone()), peers)
}

async fn listening_node() -> anyhow::Result<(Gossip, SocketAddr)> {
    let gossip = spawn_node();
    let (addr, _accept) = p2p::listen("127.0.0.1:0", gossip.clone()).await?;
    Ok((gossip, addr))
}

/// Poll `check` until it holds or five seconds pass.
async fn eventually<F, Fut>(mut check: F) -> anyhow::Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    timeout(Duration::from_secs(5), async {
        while !check().await {
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await?;
    Ok(())
}

#[tokio::test]
async fn mined_block_reaches_connected_peer() -> anyhow::Result<()> {
    let (a, addr) = listening_node().await?;
    let b = spawn_node();
    p2p::connect(&format!("ws://{addr}"), b.clone()).await?;

    let peers = a.peers().clone();
    eventually(|| {
        let peers = peers.clone();
        async move { peers.len() == 1 }
    })
    .await?;

    let MineOutcome::Mined(block) = mine_next(a.node(), "A".to_string()).await? else {
        anyhow::bail!("expected the block to be mined");
    };
    assert_eq!(block.index, 1);

    let node = b.node().clone();
    eventually(|| {
        let node = node.clone();
        let hash = block.hash.clone();
        async move { node.latest().await.map(|l| l.hash == hash).unwrap_or(false) }
    })
    .await?;
    assert_eq!(a.node().blocks().await?, b.node().blocks().await?);
    Ok(())
}

#[tokio::test]
async fn late_joiner_catches_up_on_longer_chain() -> anyhow::Result<()> {
    let (a, addr) = listening_node().await?;
    for data in ["one", "two", "three"] {
        mine_next(a.node(), data.to_string()).await?;
    }

    // b holds only genesis, so the single latest block does not link and
    // b has to ask for the full chain.
    let b = spawn_node();
    p2p::connect(&format!("ws://{addr}"), b.clone()).await?;

    let node = b.node().clone();
    eventually(|| {
        let node = node.clone();
        async move { node.blocks().await.map(|c| c.len() == 4).unwrap_or(false) }
    })
    .await?;
    assert_eq!(a.node().blocks().await?, b.node().blocks().await?);
    Ok(())
}

#[tokio::test]
async fn both_ends_list_peers_as_socket_addresses() -> anyhow::Result<()> {
    let (a, addr) = listening_node().await?;
    let b = spawn_node();
    p2p::connect(&format!("ws://{addr}"), b.clone()).await?;

    assert_eq!(b.peers().addrs(), vec![addr.to_string()]);
    let peers = a.peers().clone();
    eventually(|| {
        let peers = peers.clone();
        async move { peers.len() == 1 }
    })
    .await?;
    for listed in a.peers().addrs() {
        let inbound: SocketAddr = listed.parse()?;
        assert!(inbound.ip().is_loopback());
    }
    Ok(())
}

#[tokio::test]
async fn raw_client_gets_query_latest_then_answers() -> anyhow::Result<()> {
    let (gossip, addr) = listening_node().await?;
    let (mut ws, _) = connect_async(format!("ws://{addr}")).await?;

    let first = timeout(Duration::from_secs(5), ws.next())
        .await?
        .ok_or_else(|| anyhow::anyhow!("connection closed"))??;
    assert_eq!(first.to_text()?, r#"{"type":0}"#);

    ws.send(Frame::text(Message::QueryAll.encode()?)).await?;
    let reply = timeout(Duration::from_secs(5), ws.next())
        .await?
        .ok_or_else(|| anyhow::anyhow!("connection closed"))??;
    let Message::Response(blocks) = Message::decode(reply.to_text()?)? else {
        anyhow::bail!("expected a chain response");
    };
    assert_eq!(blocks, gossip.node().blocks().await?);
    Ok(())
}

#[tokio::test]
async fn malformed_frame_closes_the_connection() -> anyhow::Result<()> {
    let (gossip, addr) = listening_node().await?;
    let (mut ws, _) = connect_async(format!("ws://{addr}")).await?;

    let peers = gossip.peers().clone();
    eventually(|| {
        let peers = peers.clone();
        async move { peers.len() == 1 }
    })
    .await?;

    ws.send(Frame::text("not json")).await?;

    // Drain until the server side hangs up.
    timeout(Duration::from_secs(5), async {
        while let Some(Ok(frame)) = ws.next().await {
            if frame.is_close() {
                break;
            }
        }
    })
    .await?;

    eventually(|| {
        let peers = peers.clone();
        async move { peers.is_empty() }
    })
    .await?;
    assert_eq!(gossip.node().blocks().await?.len(), 1);
    Ok(())
}
