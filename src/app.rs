//! Process wiring for the demo.
//!
//! [`Demo::start`] builds the channel, registers the backend, binds both
//! listeners and spawns their accept loops. The returned [`DemoHandle`]
//! stops them.
//!
//! ```text
//!  Browser ── HTTP :8000 ──► HttpServer ──► assets/
//!     │
//!     └────── WS :8001 ────► WebSocketServer ──► Channel ──► Backend
//!                                  ▲                            │
//!                                  └──────── SessionHub ◄───────┘
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::backend::{BACKEND_OBJECT_NAME, Backend};
use crate::channel::Channel;
use crate::config::DemoConfig;
use crate::error::Result;
use crate::http::HttpServer;
use crate::transport::WebSocketServer;

// ============================================================================
// Demo
// ============================================================================

/// Entry point of the demo process.
pub struct Demo;

impl Demo {
    /// Starts the WebSocket and HTTP servers.
    ///
    /// The WebSocket listener is bound first, then the HTTP listener. Both
    /// must bind before any connection is accepted.
    ///
    /// # Errors
    ///
    /// - [`Error::Bind`](crate::Error::Bind) if either port is unavailable
    /// - [`Error::Config`](crate::Error::Config) if the backend table is invalid
    pub async fn start(config: DemoConfig) -> Result<DemoHandle> {
        let channel = Arc::new(Channel::with_queue_capacity(
            config.session_queue_capacity(),
        ));
        let backend = Backend::new(channel.notifier());
        channel.register_object(BACKEND_OBJECT_NAME, backend.object_table()?)?;

        let ws_server = WebSocketServer::bind(config.ws_addr()).await?;
        info!(
            "Starting WebSocket notifications server on {}",
            ws_server.ws_url()
        );

        let http_server = HttpServer::bind(config.http_addr(), config.assets_root()).await?;
        info!(
            "Running WebServer on {} (Press CTRL+C to quit)",
            http_server.url()
        );

        let ws_addr = ws_server.local_addr();
        let http_addr = http_server.local_addr();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let ws_task = tokio::spawn(
            ws_server.serve(Arc::clone(&channel), wait_for_shutdown(shutdown_rx.clone())),
        );

        let http_task = tokio::spawn(async move {
            if let Err(e) = http_server.serve(wait_for_shutdown(shutdown_rx)).await {
                error!(error = %e, "HTTP server failed");
            }
        });

        Ok(DemoHandle {
            http_addr,
            ws_addr,
            backend,
            channel,
            shutdown_tx,
            tasks: vec![ws_task, http_task],
        })
    }
}

/// Resolves once shutdown is requested or the handle is dropped.
async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

// ============================================================================
// DemoHandle
// ============================================================================

/// Handle to a running demo.
///
/// Dropping the handle also stops both servers, without waiting for them.
pub struct DemoHandle {
    http_addr: SocketAddr,
    ws_addr: SocketAddr,
    backend: Arc<Backend>,
    channel: Arc<Channel>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl DemoHandle {
    /// Address the HTTP server is bound to.
    #[inline]
    #[must_use]
    pub fn http_addr(&self) -> SocketAddr {
        self.http_addr
    }

    /// Address the WebSocket server is bound to.
    #[inline]
    #[must_use]
    pub fn ws_addr(&self) -> SocketAddr {
        self.ws_addr
    }

    /// The backend object served to clients.
    #[inline]
    #[must_use]
    pub fn backend(&self) -> &Arc<Backend> {
        &self.backend
    }

    /// The channel routing client sessions.
    #[inline]
    #[must_use]
    pub fn channel(&self) -> &Arc<Channel> {
        &self.channel
    }

    /// Stops both accept loops, closes every session and waits for the
    /// server tasks to finish.
    pub async fn shutdown(self) {
        info!("Shutting down");
        let _ = self.shutdown_tx.send(true);

        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Server task failed");
            }
        }

        info!("Shutdown complete");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use serde_json::{Value, json};
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::time::timeout;
    use tokio_tungstenite::tungstenite::Message;
    use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

    use crate::error::Error;

    type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

    const QUIET: Duration = Duration::from_millis(200);

    async fn start() -> (TempDir, DemoHandle) {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("index.html"), "<h1>List</h1>").expect("write");

        let loopback: SocketAddr = "127.0.0.1:0".parse().expect("addr");
        let config = DemoConfig::builder()
            .http_addr(loopback)
            .ws_addr(loopback)
            .assets_root(dir.path())
            .build()
            .expect("config");

        let handle = Demo::start(config).await.expect("start");
        (dir, handle)
    }

    async fn connect(handle: &DemoHandle) -> Client {
        let url = format!("ws://127.0.0.1:{}/", handle.ws_addr().port());
        let (ws, _) = connect_async(url.as_str()).await.expect("connect");
        ws
    }

    async fn send(ws: &mut Client, message: Value) {
        ws.send(Message::Text(message.to_string().into()))
            .await
            .expect("send");
    }

    async fn recv(ws: &mut Client) -> Value {
        let frame = timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("message in time")
            .expect("stream open")
            .expect("frame");
        serde_json::from_str(frame.to_text().expect("text")).expect("json")
    }

    async fn assert_silent(ws: &mut Client) {
        let next = timeout(QUIET, ws.next()).await;
        assert!(next.is_err(), "unexpected message: {next:?}");
    }

    /// Connects, completes the handshake and optionally subscribes.
    async fn session(handle: &DemoHandle, subscribe: bool) -> Client {
        let mut ws = connect(handle).await;
        send(&mut ws, json!({"type": "init"})).await;
        let init = recv(&mut ws).await;
        assert_eq!(init["type"], json!("init"));

        if subscribe {
            send(&mut ws, json!({"type": "subscribe", "object": "backend"})).await;
        }
        ws
    }

    #[tokio::test]
    async fn test_init_reports_backend_metadata() {
        let (_dir, handle) = start().await;
        let mut ws = connect(&handle).await;

        send(&mut ws, json!({"type": "init"})).await;
        let init = recv(&mut ws).await;
        let backend = &init["objects"]["backend"];

        assert_eq!(backend["properties"]["userName"], json!("Valerie Luna"));
        assert_eq!(
            backend["properties"]["items"],
            json!(["Milk", "Bread", "Cheese", "Beer"])
        );
        assert_eq!(backend["methods"], json!(["addItem", "removeItem"]));

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_set_property_notifies_subscribers_only() {
        let (_dir, handle) = start().await;
        let mut subscribed = session(&handle, true).await;
        let mut bystander = session(&handle, false).await;

        send(
            &mut subscribed,
            json!({"type": "setProperty", "object": "backend", "property": "userName", "value": "Ada Lovelace"}),
        )
        .await;

        let signal = recv(&mut subscribed).await;
        assert_eq!(
            signal,
            json!({"type": "signalEmitted", "object": "backend", "signal": "userNameChanged", "args": ["Ada Lovelace"]})
        );
        assert_eq!(handle.backend().user_name(), "Ada Lovelace");
        assert_silent(&mut bystander).await;

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_add_item_reaches_every_subscriber() {
        let (_dir, handle) = start().await;
        let mut first = session(&handle, true).await;
        let mut second = session(&handle, true).await;

        send(
            &mut first,
            json!({"type": "invokeMethod", "object": "backend", "method": "addItem", "args": ["Eggs"], "id": 1}),
        )
        .await;

        for ws in [&mut first, &mut second] {
            let signal = recv(ws).await;
            assert_eq!(signal["signal"], json!("itemAdded"));
            assert_eq!(signal["args"], json!(["Eggs"]));
        }
        // addItem returns nothing, so no methodReturn follows.
        assert_silent(&mut first).await;
        assert_eq!(handle.backend().items().last().map(String::as_str), Some("Eggs"));

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_unknown_method_reports_error() {
        let (_dir, handle) = start().await;
        let mut ws = session(&handle, true).await;
        let before = handle.backend().items();

        send(
            &mut ws,
            json!({"type": "invokeMethod", "object": "backend", "method": "dropTable", "args": [], "id": 9}),
        )
        .await;

        let reply = recv(&mut ws).await;
        assert_eq!(reply["type"], json!("error"));
        assert_eq!(reply["id"], json!(9));
        assert_eq!(reply["code"], json!("unknownMethod"));
        assert_eq!(handle.backend().items(), before);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_signals() {
        let (_dir, handle) = start().await;
        let mut ws = session(&handle, true).await;

        send(&mut ws, json!({"type": "unsubscribe", "object": "backend"})).await;
        send(
            &mut ws,
            json!({"type": "invokeMethod", "object": "backend", "method": "removeItem", "args": ["Milk"]}),
        )
        .await;

        assert_silent(&mut ws).await;
        assert!(!handle.backend().items().contains(&"Milk".to_string()));

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_http_serves_assets() {
        let (_dir, handle) = start().await;
        let port = handle.http_addr().port();

        for (path, status) in [("/", "200"), ("/nonexistent.file", "404")] {
            let mut stream = TcpStream::connect(("127.0.0.1", port)).await.expect("connect");
            let request =
                format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
            stream.write_all(request.as_bytes()).await.expect("write");

            let mut response = String::new();
            stream.read_to_string(&mut response).await.expect("read");
            assert!(
                response.starts_with(&format!("HTTP/1.1 {status}")),
                "{path}: {response}"
            );
        }

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_closes_sessions() {
        let (_dir, handle) = start().await;
        let mut ws = session(&handle, true).await;
        let channel = Arc::clone(handle.channel());

        handle.shutdown().await;

        let next = timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("close in time");
        assert!(matches!(next, None | Some(Ok(Message::Close(_))) | Some(Err(_))));
        assert_eq!(channel.hub().session_count(), 0);
    }

    #[tokio::test]
    async fn test_port_in_use_is_fatal() {
        let (dir, running) = start().await;

        let config = DemoConfig::builder()
            .ws_addr(running.ws_addr())
            .http_port(0)
            .assets_root(dir.path())
            .build()
            .expect("config");

        let err = Demo::start(config).await.err().expect("bind fails");
        assert!(matches!(err, Error::Bind { .. }));
        assert!(err.is_fatal());

        running.shutdown().await;
    }
}
