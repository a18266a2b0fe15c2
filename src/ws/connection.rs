//! WebSocket transport loop.
//!
//! Splits the socket into a writer task (drains the connection's outbound
//! queue into the sink) and a reader loop (feeds text payloads to the
//! [`ProtocolHandler`]). Registration happens before the first frame is
//! read; unregistration happens exactly once, however the loop ends,
//! including when the registry evicts a connection whose queue filled up.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket, close_code};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::time::Instant;

use super::protocol::{Flow, ProtocolHandler};
use crate::domain::Connection;
use crate::domain::connection::{Outbound, OutboundReceiver};
use crate::service::ChatService;

/// Upper bound on waiting for the writer to flush after teardown.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs one client connection to completion.
///
/// `auth_timeout` bounds how long the connection may stay
/// unauthenticated; `None` disables the bound. `outbound_capacity` bounds
/// the frames queued for a peer that is not reading.
pub async fn run_connection(
    socket: WebSocket,
    service: Arc<ChatService>,
    auth_timeout: Option<Duration>,
    outbound_capacity: usize,
) {
    let (ws_tx, mut ws_rx) = socket.split();
    let (connection, outbound_rx) = Connection::with_capacity(outbound_capacity);
    let connection_id = connection.id();
    let evicted = connection.eviction_signal();

    service.registry().register(&connection).await;
    tracing::info!(%connection_id, "ws connection opened");

    let mut writer = tokio::spawn(writer_task(ws_tx, outbound_rx));
    let mut handler = ProtocolHandler::new(connection, Arc::clone(&service));

    let deadline = auth_timeout.and_then(|t| Instant::now().checked_add(t));
    let auth_deadline = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now));
    tokio::pin!(auth_deadline);

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                let flow = match msg {
                    Some(Ok(Message::Text(text))) => handler.handle_text(text.as_str()).await,
                    Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                        Ok(text) => handler.handle_text(text).await,
                        Err(_) => {
                            tracing::debug!(%connection_id, "dropping non-UTF-8 binary frame");
                            Flow::Continue
                        }
                    },
                    Some(Ok(Message::Close(_))) | None => Flow::Close,
                    Some(Ok(_)) => Flow::Continue,
                    Some(Err(e)) => {
                        tracing::warn!(%connection_id, error = %e, "ws receive error");
                        Flow::Close
                    }
                };
                if flow == Flow::Close {
                    break;
                }
            }
            _ = &mut writer => {
                tracing::debug!(%connection_id, "ws writer ended");
                break;
            }
            () = evicted.notified() => {
                tracing::info!(%connection_id, "closing connection evicted by broadcast");
                break;
            }
            () = &mut auth_deadline, if deadline.is_some() && !handler.is_authenticated() => {
                tracing::info!(%connection_id, "closing unauthenticated connection after timeout");
                let _ = handler
                    .connection()
                    .send_close(close_code::POLICY, "authentication timeout");
                break;
            }
        }
    }

    let connection_id = handler.close();
    service.registry().unregister(connection_id).await;

    // Registry and handler senders are gone; the writer drains what is
    // queued and closes the sink.
    if !writer.is_finished()
        && tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer)
            .await
            .is_err()
    {
        tracing::debug!(%connection_id, "ws writer did not drain in time");
        writer.abort();
    }

    tracing::info!(%connection_id, "ws connection closed");
}

/// Forwards queued frames to the socket until the queue closes or a
/// write fails.
async fn writer_task(mut ws_tx: SplitSink<WebSocket, Message>, mut rx: OutboundReceiver) {
    while let Some(item) = rx.recv().await {
        let (msg, last) = match item {
            Outbound::Frame(json) => (Message::text(json.to_string()), false),
            Outbound::Close { code, reason } => (
                Message::Close(Some(CloseFrame {
                    code,
                    reason: reason.into(),
                })),
                true,
            ),
        };
        if ws_tx.send(msg).await.is_err() || last {
            return;
        }
    }
    let _ = ws_tx.close().await;
}
