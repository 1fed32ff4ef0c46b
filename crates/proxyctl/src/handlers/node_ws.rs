//! the node channel endpoint.
//!
//! nodes connect here over websocket, authenticate with their
//! pre-shared secret, and then hold the channel open: the master sends
//! configuration pushes down it, the node sends acknowledgments and
//! traffic telemetry back. one lightweight task per connected node
//! pumps the channel.

use std::collections::HashMap;
use std::time::Duration;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use chrono::Utc;
use serde_json::value::RawValue;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use proxyctl_db::Database;
use proxyctl_proto::{ClientCounters, MasterFrame, NodeFrame};
use proxyctl_types::{NodeId, NodeStatus};

use crate::AppState;
use crate::registry::{AckOutcome, NodeCommand};

/// how long a freshly connected node has to present its hello frame.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
enum ChannelError {
    #[error("no hello frame within the handshake window")]
    HandshakeTimeout,

    #[error(transparent)]
    Proto(#[from] proxyctl_proto::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Db(#[from] proxyctl_db::Error),

    #[error("websocket error: {0}")]
    Socket(#[from] axum::Error),
}

/// handle a node's websocket connection.
pub async fn node_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| async move {
        if let Err(e) = handle_connection(socket, state).await {
            debug!(error = %e, "node channel closed with error");
        }
    })
}

async fn handle_connection(mut socket: WebSocket, state: AppState) -> Result<(), ChannelError> {
    // registration handshake: the first frame must be hello with a
    // recognized name and matching secret
    let hello = match timeout(HANDSHAKE_TIMEOUT, socket.recv()).await {
        Err(_) => return Err(ChannelError::HandshakeTimeout),
        Ok(None) => return Ok(()),
        Ok(Some(message)) => message?,
    };
    let Message::Text(text) = hello else {
        return reject(&mut socket, "handshake must be a text frame").await;
    };
    let Ok(NodeFrame::Hello { name, secret }) = NodeFrame::from_json(&text) else {
        return reject(&mut socket, "first frame must be hello").await;
    };

    let node = match state.db.get_node_by_name(&name).await? {
        Some(node) if node.secret == secret => node,
        _ => {
            warn!(node = %name, "rejected node registration: unknown name or mismatched secret");
            return reject(&mut socket, "unrecognized node or secret").await;
        }
    };

    let ok = MasterFrame::HelloOk {
        node_id: node.id.as_i64(),
    };
    socket.send(Message::Text(ok.to_json()?.into())).await?;

    state
        .db
        .set_node_status(node.id, NodeStatus::Connected, Some(Utc::now()))
        .await?;
    let (commands, token) = state
        .registry
        .register(node.id, state.config.push.channel_capacity)
        .await;
    info!(node = %node.name, id = %node.id, "node connected");

    let result = pump(&mut socket, commands, &state, node.id).await;

    // a replacement connection owns the registry entry now; only the
    // registration that still holds it marks the node disconnected
    if state.registry.unregister(node.id, token).await {
        state
            .db
            .set_node_status(node.id, NodeStatus::Disconnected, None)
            .await?;
        info!(node = %node.name, id = %node.id, "node disconnected");
    }
    result
}

async fn reject(socket: &mut WebSocket, reason: &str) -> Result<(), ChannelError> {
    let frame = MasterFrame::HelloRejected {
        reason: reason.to_string(),
    };
    let _ = socket.send(Message::Text(frame.to_json()?.into())).await;
    let _ = socket.send(Message::Close(None)).await;
    Ok(())
}

/// pump the established channel: configuration pushes flow down,
/// acknowledgments and telemetry flow back.
///
/// at most one push is outstanding; a newer one supersedes it. dropping
/// out of this loop drops any pending reply, which fails the awaiting
/// push immediately rather than letting it wait out its ack timeout.
async fn pump(
    socket: &mut WebSocket,
    mut commands: mpsc::Receiver<NodeCommand>,
    state: &AppState,
    node_id: NodeId,
) -> Result<(), ChannelError> {
    let mut pending: Option<(u64, oneshot::Sender<AckOutcome>)> = None;
    let mut next_push_id: u64 = 0;

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                // the registry replaced this connection
                None => return Ok(()),
                Some(NodeCommand::Push { document, reply }) => {
                    next_push_id += 1;
                    if let Some((superseded, old)) = pending.take() {
                        debug!(%node_id, superseded, "superseding outstanding push");
                        let _ = old.send(AckOutcome::Superseded);
                    }
                    let frame = MasterFrame::ConfigPush {
                        push_id: next_push_id,
                        config: RawValue::from_string(document)?,
                    };
                    socket.send(Message::Text(frame.to_json()?.into())).await?;
                    pending = Some((next_push_id, reply));
                }
            },
            message = socket.recv() => match message {
                None => return Ok(()),
                Some(Err(e)) => return Err(e.into()),
                Some(Ok(Message::Close(_))) => return Ok(()),
                Some(Ok(Message::Text(text))) => match NodeFrame::from_json(&text) {
                    Ok(NodeFrame::Ack { push_id, applied, reason }) => {
                        match pending.take() {
                            Some((id, reply)) if id == push_id => {
                                let outcome = if applied {
                                    AckOutcome::Applied
                                } else {
                                    AckOutcome::Rejected(
                                        reason.unwrap_or_else(|| "unspecified".to_string()),
                                    )
                                };
                                let _ = reply.send(outcome);
                            }
                            outstanding => {
                                debug!(%node_id, push_id, "acknowledgment for a superseded push");
                                pending = outstanding;
                            }
                        }
                    }
                    Ok(NodeFrame::Traffic { up, down, clients }) => {
                        record_traffic(state, node_id, up, down, clients).await;
                    }
                    Ok(NodeFrame::Hello { .. }) => {
                        debug!(%node_id, "ignoring repeated hello");
                    }
                    Err(e) => {
                        debug!(%node_id, error = %e, "undecodable frame from node");
                    }
                },
                // pings/pongs are answered by the websocket layer
                Some(Ok(_)) => {}
            },
        }
    }
}

/// fold a telemetry report into the store.
///
/// per-client counters are matched to inbounds through the clients
/// embedded in each inbound's settings; unknown emails are dropped.
async fn record_traffic(
    state: &AppState,
    node_id: NodeId,
    up: i64,
    down: i64,
    clients: Vec<ClientCounters>,
) {
    debug!(%node_id, up, down, clients = clients.len(), "traffic report");

    if let Err(e) = state
        .db
        .set_node_status(node_id, NodeStatus::Connected, Some(Utc::now()))
        .await
    {
        warn!(%node_id, error = %e, "failed to stamp node last_seen");
    }
    if clients.is_empty() {
        return;
    }

    let inbounds = match state.db.list_inbounds_for_node(node_id).await {
        Ok(inbounds) => inbounds,
        Err(e) => {
            warn!(%node_id, error = %e, "failed to resolve inbounds for traffic report");
            return;
        }
    };
    let mut index = HashMap::new();
    for inbound in &inbounds {
        for client in inbound.clients() {
            index.entry(client.email).or_insert(inbound.id);
        }
    }

    for counter in clients {
        match index.get(&counter.email) {
            Some(&inbound_id) => {
                if let Err(e) = state
                    .db
                    .record_client_traffic(inbound_id, &counter.email, counter.up, counter.down)
                    .await
                {
                    warn!(%node_id, email = %counter.email, error = %e, "failed to record client traffic");
                }
            }
            None => {
                debug!(%node_id, email = %counter.email, "traffic report for unknown client");
            }
        }
    }
}
