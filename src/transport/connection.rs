//! Per-session WebSocket event loop.
//!
//! Wraps one upgraded WebSocket into a channel session. The loop handles:
//!
//! - Incoming text frames, dispatched synchronously to the channel
//! - Outgoing messages drained from the session's outbound queue
//! - Close detection in either direction

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use serde_json::to_string;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, trace, warn};

use crate::channel::Channel;
use crate::identifiers::SessionId;

// ============================================================================
// serve_session
// ============================================================================

/// Runs a session over `ws_stream` until either side closes.
///
/// Attaches a session on entry and detaches it on exit, so subscriptions
/// never outlive the connection.
pub async fn serve_session<S>(channel: Arc<Channel>, ws_stream: WebSocketStream<S>) -> SessionId
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (session_id, mut outbound) = channel.attach();
    let (mut ws_write, mut ws_read) = ws_stream.split();

    info!(session_id = %session_id, "Session established");

    loop {
        tokio::select! {
            // Incoming messages from the client
            message = ws_read.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        trace!(session_id = %session_id, len = text.len(), "Message received");
                        channel.dispatch(session_id, &text);
                    }

                    Some(Ok(Message::Close(_))) => {
                        debug!(session_id = %session_id, "WebSocket closed by client");
                        break;
                    }

                    Some(Err(e)) => {
                        warn!(session_id = %session_id, error = %e, "WebSocket error");
                        break;
                    }

                    None => {
                        debug!(session_id = %session_id, "WebSocket stream ended");
                        break;
                    }

                    // Ignore Binary, Ping, Pong
                    _ => {}
                }
            }

            // Replies and signals queued by the channel
            outgoing = outbound.recv() => {
                let Some(message) = outgoing else {
                    debug!(session_id = %session_id, "Session closed by channel");
                    let _ = ws_write.close().await;
                    break;
                };

                let json = match to_string(&message) {
                    Ok(json) => json,
                    Err(e) => {
                        error!(session_id = %session_id, error = %e, "Failed to serialize message");
                        continue;
                    }
                };

                if let Err(e) = ws_write.send(Message::Text(json.into())).await {
                    warn!(session_id = %session_id, error = %e, "Failed to send message");
                    break;
                }
            }
        }
    }

    channel.detach(session_id);
    info!(session_id = %session_id, "Session closed");

    session_id
}
