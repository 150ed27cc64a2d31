//! WebSocket upgrade handler and the per-connection pumps.
//!
//! Each connection gets two tasks. The outbound pump owns the write half of
//! the socket and is the only writer; it drains the endpoint queue until the
//! hub closes it. The inbound pump owns the read half and only watches for
//! the peer going away. Either pump ending leads to `unregister`, which is
//! idempotent, so the order in which they stop does not matter.

use std::fmt;
use std::time::Duration;

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio::time;

use crate::auth::middleware::WsAuthUser;
use crate::config::Config;
use crate::AppState;

use super::events::Frame;
use super::fanout::Hub;
use super::session::{Endpoint, EndpointId};

/// Per-connection tuning taken from [`Config`].
#[derive(Debug, Clone, Copy)]
pub struct PumpSettings {
    /// Outbound queue slots before the endpoint counts as unresponsive.
    pub capacity: usize,
    /// Upper bound on any single socket write.
    pub write_timeout: Duration,
}

impl From<&Config> for PumpSettings {
    fn from(config: &Config) -> Self {
        Self {
            capacity: config.ws_buffer_capacity,
            write_timeout: config.ws_write_timeout,
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/ws", get(ws_upgrade))
}

async fn ws_upgrade(
    WsAuthUser(user): WsAuthUser,
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> Response {
    let hub = state.hub.clone();
    let settings = PumpSettings::from(state.config.as_ref());
    let user_id = user.user_id;

    ws.on_failed_upgrade(|err| tracing::warn!(?err, "websocket upgrade failed"))
        .on_upgrade(move |socket| attach(socket, user_id, hub, settings))
}

/// Bind an upgraded socket to a new endpoint, register it and start both
/// pumps. Returns as soon as the pumps are spawned.
pub async fn attach(socket: WebSocket, user_id: String, hub: Hub, settings: PumpSettings) {
    let (endpoint, outbox) = Endpoint::new(user_id, settings.capacity);
    let endpoint_id = endpoint.id().to_string();
    let user_id = endpoint.identity().to_string();

    if hub.register(endpoint).is_err() {
        tracing::warn!(%endpoint_id, "hub is not running, dropping connection");
        return;
    }

    tracing::info!(%endpoint_id, %user_id, "live connection attached");

    let (sink, stream) = socket.split();
    let (writer_done, writer_gone) = oneshot::channel();

    tokio::spawn(write_pump(
        sink,
        outbox,
        hub.clone(),
        endpoint_id.clone(),
        settings.write_timeout,
        writer_done,
    ));
    tokio::spawn(read_pump(stream, hub, endpoint_id, writer_gone));
}

/// Drain the endpoint queue onto the socket, one text message per frame.
///
/// Stops when the hub closes the queue (sending a close frame first) or when
/// a write fails or exceeds `write_timeout` (unregistering itself). Dropping
/// `writer_done` on exit tells the inbound pump to stop too.
pub async fn write_pump<S, E>(
    mut sink: S,
    mut outbox: mpsc::Receiver<Frame>,
    hub: Hub,
    endpoint_id: EndpointId,
    write_timeout: Duration,
    writer_done: oneshot::Sender<()>,
) where
    S: Sink<Message, Error = E> + Unpin,
    E: fmt::Debug,
{
    loop {
        let Some(frame) = outbox.recv().await else {
            let close = Message::Close(Some(CloseFrame {
                code: close_code::NORMAL,
                reason: "".into(),
            }));
            let _ = time::timeout(write_timeout, sink.send(close)).await;
            break;
        };

        match time::timeout(write_timeout, sink.send(Message::Text(frame))).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::debug!(?err, %endpoint_id, "ws write failed");
                hub.unregister(&endpoint_id);
                break;
            }
            Err(_elapsed) => {
                tracing::warn!(%endpoint_id, ?write_timeout, "ws write timed out");
                hub.unregister(&endpoint_id);
                break;
            }
        }
    }

    let _ = time::timeout(write_timeout, sink.close()).await;
    drop(writer_done);
    tracing::debug!(%endpoint_id, "outbound pump stopped");
}

/// Read until the peer closes, the stream errors, or the outbound pump has
/// stopped. Inbound payloads are discarded. Always ends with `unregister`.
pub async fn read_pump<St, E>(
    mut stream: St,
    hub: Hub,
    endpoint_id: EndpointId,
    mut writer_gone: oneshot::Receiver<()>,
) where
    St: Stream<Item = Result<Message, E>> + Unpin,
    E: fmt::Debug,
{
    loop {
        tokio::select! {
            msg = stream.next() => match msg {
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!(?frame, %endpoint_id, "peer closed connection");
                    break;
                }
                Some(Ok(_)) => continue,
                Some(Err(err)) => {
                    tracing::debug!(?err, %endpoint_id, "ws read error");
                    break;
                }
                None => break,
            },
            _ = &mut writer_gone => break,
        }
    }

    hub.unregister(&endpoint_id);
    tracing::info!(%endpoint_id, "live connection detached");
}
