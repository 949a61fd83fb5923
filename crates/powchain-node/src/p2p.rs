use crate::{
    constants::ACCEPT_RETRY_DELAY_MS,
    error::NodeError,
    gossip::Gossip,
    peers::{Outbox, PeerId},
};
use futures_util::{SinkExt, StreamExt};
use powchain_core::Message;
use std::{net::SocketAddr, time::Duration};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::{TcpListener, TcpStream, ToSocketAddrs},
    task::JoinHandle,
};
use tokio_tungstenite::{
    accept_async, connect_async, tungstenite::Message as Frame, MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, info, warn};

/// Bind the peer-to-peer WebSocket listener and accept connections in the
/// background. Returns the bound address.
pub async fn listen(
    addr: impl ToSocketAddrs,
    gossip: Gossip,
) -> Result<(SocketAddr, JoinHandle<()>), NodeError> {
    let listener = TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    info!("listening websocket p2p on {local}");
    Ok((local, tokio::spawn(accept_loop(listener, gossip))))
}

async fn accept_loop(listener: TcpListener, gossip: Gossip) {
    loop {
        let (stream, remote) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("failed to accept p2p connection: {e}");
                // Errors like EMFILE persist until something closes.
                tokio::time::sleep(Duration::from_millis(ACCEPT_RETRY_DELAY_MS)).await;
                continue;
            }
        };
        let gossip = gossip.clone();
        tokio::spawn(async move {
            match accept_async(stream).await {
                Ok(ws) => {
                    if let Err(e) = start_connection(ws, remote.to_string(), gossip) {
                        warn!(%remote, "failed to start connection: {e}");
                    }
                }
                Err(e) => debug!(%remote, "websocket handshake failed: {e}"),
            }
        });
    }
}

/// Dial a peer such as `ws://127.0.0.1:6001` and register it on success.
pub async fn connect(url: &str, gossip: Gossip) -> Result<PeerId, NodeError> {
    let (ws, _) = connect_async(url).await?;
    let addr = remote_addr(&ws).unwrap_or_else(|| url.to_string());
    start_connection(ws, addr, gossip)
}

/// `ip:port` of the far end of a dialed connection, matching how accepted
/// peers are listed.
fn remote_addr(ws: &WebSocketStream<MaybeTlsStream<TcpStream>>) -> Option<String> {
    match ws.get_ref() {
        MaybeTlsStream::Plain(stream) => stream.peer_addr().ok().map(|a| a.to_string()),
        _ => None,
    }
}

/// Dial in the background; a failure is logged and not retried.
pub fn spawn_connect(url: String, gossip: Gossip) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = connect(&url, gossip).await {
            warn!(%url, "connection failed: {e}");
        }
    })
}

fn start_connection<S>(
    ws: WebSocketStream<S>,
    addr: String,
    gossip: Gossip,
) -> Result<PeerId, NodeError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (peer, outbox) = gossip.on_connect(addr)?;
    tokio::spawn(drive(ws, peer, outbox, gossip));
    Ok(peer)
}

/// Pump one connection: a writer task drains the outbox, this task reads and
/// dispatches frames. Any read error, close frame or undecodable payload
/// ends the connection and deregisters the peer.
async fn drive<S>(ws: WebSocketStream<S>, peer: PeerId, mut outbox: Outbox, gossip: Gossip)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut sink, mut stream) = ws.split();

    let writer = tokio::spawn(async move {
        while let Some(text) = outbox.recv().await {
            if let Err(e) = sink.send(Frame::text(text)).await {
                debug!(%peer, "write failed: {e}");
                break;
            }
        }
        let _ = sink.close().await;
    });

    while let Some(frame) = stream.next().await {
        let decoded = match frame {
            Ok(Frame::Text(text)) => Message::decode(text.as_str()),
            Ok(Frame::Binary(bytes)) => match std::str::from_utf8(&bytes) {
                Ok(text) => Message::decode(text),
                Err(e) => {
                    warn!(%peer, "closing connection, binary frame is not utf-8: {e}");
                    break;
                }
            },
            Ok(Frame::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!(%peer, "connection error: {e}");
                break;
            }
        };
        let message = match decoded {
            Ok(message) => message,
            Err(e) => {
                warn!(%peer, "closing connection: {e}");
                break;
            }
        };
        if let Err(e) = gossip.on_message(peer, message).await {
            warn!(%peer, "failed to handle message: {e}");
            break;
        }
    }

    // Dropping the registry entry closes the outbox, which ends the writer.
    gossip.on_close(peer);
    let _ = writer.await;
}
