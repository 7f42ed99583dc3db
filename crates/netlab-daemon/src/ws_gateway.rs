// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WSGateway (§4.3 consumer, §6): the browser-facing half of the two
//! WebSocket endpoints. `/ws/labs/{lab_id}/state` streams Broadcaster
//! frames after an initial snapshot; `/labs/{lab_id}/nodes/{node}/console`
//! bridges to the owning agent's console endpoint through
//! `netlab_adapters::console::proxy`.

use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use netlab_adapters::console::ByteDuplex;
use netlab_adapters::RuntimeRouter;
use netlab_core::{LabId, NodeId};
use netlab_engine::Broadcaster;
use netlab_storage::Repository;
use netlab_wire::{BroadcastData, BroadcastFrame, ClientMessage, LinkStateSnapshot, NodeStateSnapshot, ServerMessage};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_hdr_async, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("websocket handshake failed: {0}")]
    Handshake(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("no route matches path {0}")]
    UnknownPath(String),
    #[error("no such node {0}")]
    UnknownNode(NodeId),
    #[error("agent error: {0}")]
    Agent(#[from] netlab_adapters::AgentClientError),
}

/// Accepts connections on `listen_addr` until `cancellation` fires, each
/// one handled on its own task so a stuck console proxy never blocks new
/// connections.
pub async fn run(
    listen_addr: &str,
    repository: Arc<Repository>,
    broadcaster: Broadcaster,
    router: Arc<RuntimeRouter>,
    cancellation: CancellationToken,
) -> Result<(), GatewayError> {
    let listener = TcpListener::bind(listen_addr).await?;
    info!(addr = listen_addr, "ws gateway listening");
    loop {
        tokio::select! {
            _ = cancellation.cancelled() => return Ok(()),
            accepted = listener.accept() => {
                let (stream, peer) = accepted?;
                let repository = repository.clone();
                let broadcaster = broadcaster.clone();
                let router = router.clone();
                let cancellation = cancellation.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, repository, broadcaster, router, cancellation).await {
                        warn!(%peer, error = %e, "ws gateway connection ended with an error");
                    }
                });
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    repository: Arc<Repository>,
    broadcaster: Broadcaster,
    router: Arc<RuntimeRouter>,
    cancellation: CancellationToken,
) -> Result<(), GatewayError> {
    let path = Arc::new(StdMutex::new(String::new()));
    let path_write = path.clone();
    let ws_stream = accept_hdr_async(stream, move |req: &Request, resp: Response| {
        *path_write.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = req.uri().path().to_string();
        Ok(resp)
    })
    .await?;
    let path = path.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clone();

    if let Some(lab_id) = parse_state_path(&path) {
        handle_state_stream(ws_stream, lab_id, &repository, &broadcaster, cancellation).await
    } else if let Some((lab_id, node_id)) = parse_console_path(&path) {
        handle_console_proxy(ws_stream, lab_id, node_id, &repository, &router).await
    } else {
        Err(GatewayError::UnknownPath(path))
    }
}

fn parse_state_path(path: &str) -> Option<LabId> {
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    match segments.as_slice() {
        ["ws", "labs", lab_id, "state"] => Some(LabId::from(*lab_id)),
        _ => None,
    }
}

fn parse_console_path(path: &str) -> Option<(LabId, NodeId)> {
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    match segments.as_slice() {
        ["labs", lab_id, "nodes", node_id, "console"] => Some((LabId::from(*lab_id), NodeId::from(*node_id))),
        _ => None,
    }
}

fn node_snapshot(state: &netlab_core::NodeState, host_name: Option<String>) -> NodeStateSnapshot {
    let display = netlab_core::NodeStateMachine::compute_display_state(state.actual_state, state.desired_state);
    NodeStateSnapshot {
        node_id: state.node_id,
        display_state: display.to_string(),
        image_sync_status: state.image_sync_status.clone(),
        enforcement_attempts: state.enforcement_attempts,
        host_name,
    }
}

fn link_snapshot(state: &netlab_core::LinkState) -> LinkStateSnapshot {
    LinkStateSnapshot {
        link_state_id: state.id,
        actual_state: state.actual_state.to_string(),
        is_cross_host: state.is_cross_host,
        source_host_id: state.source_host_id,
        target_host_id: state.target_host_id,
        oper_epoch: state.oper_epoch,
    }
}

fn initial_frames(repository: &Repository, lab_id: LabId) -> Vec<BroadcastFrame> {
    let snapshot = repository.snapshot();
    let nodes: Vec<NodeStateSnapshot> = snapshot
        .node_states_for_lab(lab_id)
        .map(|ns| {
            let host_name = ns.host_id.and_then(|id| snapshot.hosts.get(&id)).map(|h| h.address.clone());
            node_snapshot(ns, host_name)
        })
        .collect();
    let links: Vec<LinkStateSnapshot> = snapshot.link_states_for_lab(lab_id).map(link_snapshot).collect();
    vec![
        BroadcastFrame::new(chrono::Utc::now(), BroadcastData::InitialState { lab_id, nodes }),
        BroadcastFrame::new(chrono::Utc::now(), BroadcastData::InitialLinks { lab_id, links }),
    ]
}

async fn handle_state_stream(
    mut ws: WebSocketStream<TcpStream>,
    lab_id: LabId,
    repository: &Repository,
    broadcaster: &Broadcaster,
    cancellation: CancellationToken,
) -> Result<(), GatewayError> {
    for frame in initial_frames(repository, lab_id) {
        send_frame(&mut ws, &frame).await;
    }

    let mut receiver = broadcaster.subscribe(lab_id);
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await;

    loop {
        tokio::select! {
            _ = cancellation.cancelled() => {
                let _ = ws.close(None).await;
                return Ok(());
            }
            incoming = ws.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if let Ok(msg) = serde_json::from_str::<ClientMessage>(&text) {
                            match msg {
                                ClientMessage::Ping => {
                                    let pong = serde_json::to_string(&ServerMessage::Pong).unwrap_or_default();
                                    let _ = ws.send(Message::Text(pong.into())).await;
                                }
                                ClientMessage::Refresh => {
                                    for frame in initial_frames(repository, lab_id) {
                                        send_frame(&mut ws, &frame).await;
                                    }
                                }
                            }
                        }
                        heartbeat.reset();
                    }
                    Some(Ok(Message::Close(_))) | None => return Ok(()),
                    Some(Ok(_)) => { heartbeat.reset(); }
                    Some(Err(_)) => return Ok(()),
                }
            }
            received = receiver.recv() => {
                match received {
                    Ok(frame) => { send_frame(&mut ws, &frame).await; heartbeat.reset(); }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => return Ok(()),
                }
            }
            _ = heartbeat.tick() => {
                let frame = BroadcastFrame::new(chrono::Utc::now(), BroadcastData::Heartbeat);
                send_frame(&mut ws, &frame).await;
            }
        }
    }
}

async fn send_frame(ws: &mut WebSocketStream<TcpStream>, frame: &BroadcastFrame) {
    if let Ok(text) = serde_json::to_string(frame) {
        let _ = ws.send(Message::Text(text.into())).await;
    }
}

async fn handle_console_proxy(
    ws: WebSocketStream<TcpStream>,
    lab_id: LabId,
    node_id: NodeId,
    repository: &Repository,
    router: &RuntimeRouter,
) -> Result<(), GatewayError> {
    let node = repository.get_node(&node_id).ok_or(GatewayError::UnknownNode(node_id))?;
    let state = repository.get_node_state(lab_id, node_id).ok_or(GatewayError::UnknownNode(node_id))?;
    let host_id = state.host_id.ok_or(GatewayError::UnknownNode(node_id))?;
    let client = router.get(host_id)?;
    let agent_stream = client.open_console(lab_id, &node.container_name).await?;

    let browser = BrowserDuplex { inner: ws };
    netlab_adapters::console::proxy(browser, agent_stream).await;
    Ok(())
}

/// The browser leg of the console proxy: wraps the gateway's own
/// WebSocket connection so `netlab_adapters::console::proxy` can shuttle
/// bytes between it and the agent-side `ConsoleStream` without knowing
/// either transport concretely.
struct BrowserDuplex {
    inner: WebSocketStream<TcpStream>,
}

#[async_trait]
impl ByteDuplex for BrowserDuplex {
    async fn recv(&mut self) -> Option<Vec<u8>> {
        loop {
            match self.inner.next().await? {
                Ok(Message::Binary(data)) => return Some(data.to_vec()),
                Ok(Message::Close(_)) => return None,
                Ok(_) => continue,
                Err(_) => return None,
            }
        }
    }

    async fn send(&mut self, bytes: Vec<u8>) -> bool {
        self.inner.send(Message::Binary(bytes.into())).await.is_ok()
    }
}
