//! WebSocket listener for channel clients.
//!
//! # Connection Flow
//!
//! 1. [`WebSocketServer::bind`] binds the listening socket
//! 2. [`WebSocketServer::serve`] accepts TCP connections until shutdown
//! 3. Each connection is upgraded to WebSocket on its own task
//! 4. The upgraded socket becomes a channel session (see [`serve_session`])

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::channel::Channel;
use crate::error::{Error, Result};

use super::connection::serve_session;

// ============================================================================
// WebSocketServer
// ============================================================================

/// A bound WebSocket listener.
///
/// # Example
///
/// ```ignore
/// let server = WebSocketServer::bind(addr).await?;
/// println!("listening on {}", server.ws_url());
/// server.serve(channel, tokio::signal::ctrl_c().map(|_| ())).await;
/// ```
pub struct WebSocketServer {
    /// TCP listener for incoming connections.
    listener: TcpListener,
    /// Address the listener is bound to.
    local_addr: SocketAddr,
}

impl WebSocketServer {
    /// Binds the listener.
    ///
    /// Use port 0 to let the OS pick a free port.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Bind`] if the address is unavailable.
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| Error::bind(addr, e))?;
        let local_addr = listener.local_addr()?;

        debug!(addr = %local_addr, "WebSocket server bound");

        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Returns the port the server is bound to.
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Returns the bound address.
    #[inline]
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns the loopback WebSocket URL for this server.
    ///
    /// Format: `ws://127.0.0.1:{port}/`
    #[inline]
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}/", self.port())
    }

    /// Accepts connections until `shutdown` resolves.
    ///
    /// On shutdown every session is closed.
    pub async fn serve<F>(self, channel: Arc<Channel>, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!(port = self.port(), "WebSocket server accepting connections");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            let channel = Arc::clone(&channel);
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(channel, stream, addr).await {
                                    warn!(error = %e, %addr, "Connection handling failed");
                                }
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "Accept failed");
                        }
                    }
                }

                () = &mut shutdown => {
                    debug!("Accept loop shutting down");
                    break;
                }
            }
        }

        channel.close_all();
        info!(port = self.port(), "WebSocket server stopped");
    }
}

/// Upgrades one TCP connection and runs its session.
async fn handle_connection(
    channel: Arc<Channel>,
    stream: TcpStream,
    addr: SocketAddr,
) -> Result<()> {
    debug!(%addr, "New TCP connection, upgrading");

    let ws_stream = tokio_tungstenite::accept_async(stream)
        .await
        .map_err(|e| Error::connection(format!("WebSocket upgrade failed: {e}")))?;

    serve_session(channel, ws_stream).await;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use serde_json::{Value, json};
    use tokio::sync::oneshot;
    use tokio::time::timeout;
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::Message;

    use crate::backend::{BACKEND_OBJECT_NAME, Backend};

    fn loopback() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
    }

    #[tokio::test]
    async fn test_bind_random_port() {
        let server = WebSocketServer::bind(loopback()).await.expect("bind");

        assert!(server.port() > 0);
        assert_eq!(server.ws_url(), format!("ws://127.0.0.1:{}/", server.port()));
        assert_eq!(server.local_addr().ip(), IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    #[tokio::test]
    async fn test_bind_port_in_use() {
        let first = WebSocketServer::bind(loopback()).await.expect("bind");
        let taken = first.local_addr();

        let err = WebSocketServer::bind(taken).await.err().expect("port in use");
        assert!(matches!(err, Error::Bind { addr, .. } if addr == taken));
    }

    #[tokio::test]
    async fn test_session_round_trip() {
        let channel = Arc::new(Channel::new());
        let backend = Backend::new(channel.notifier());
        channel
            .register_object(BACKEND_OBJECT_NAME, backend.object_table().expect("table"))
            .expect("register");

        let server = WebSocketServer::bind(loopback()).await.expect("bind");
        let url = server.ws_url();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(server.serve(Arc::clone(&channel), async move {
            let _ = stop_rx.await;
        }));

        let (mut ws, _) = connect_async(url.as_str()).await.expect("connect");
        ws.send(Message::Text(r#"{"type":"init"}"#.into()))
            .await
            .expect("send");

        let reply = timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("reply in time")
            .expect("stream open")
            .expect("frame");
        let reply: Value = serde_json::from_str(reply.to_text().expect("text")).expect("json");

        assert_eq!(reply["type"], json!("init"));
        assert_eq!(
            reply["objects"]["backend"]["properties"]["userName"],
            json!("Valerie Luna")
        );

        let _ = stop_tx.send(());
        task.await.expect("server task");
        assert_eq!(channel.hub().session_count(), 0);
    }
}
