// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The one inbound HTTP surface the core itself terminates (§6):
//! `POST /callbacks/carrier-state`. Agents push carrier transitions here
//! instead of the controller polling for them. A narrow, single-purpose
//! callback doesn't need a router or a framework, just enough HTTP/1.1 to
//! read one request and write one response.

use std::sync::Arc;

use netlab_core::LabId;
use netlab_engine::{Broadcaster, LinkManager};
use netlab_storage::Repository;
use netlab_wire::{BroadcastData, CarrierStateCallback};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::warn;

const MAX_REQUEST_BYTES: usize = 16 * 1024;

pub async fn run<C: netlab_core::Clock + 'static>(
    listen_addr: &str,
    repository: Arc<Repository>,
    link_manager: Arc<LinkManager<C>>,
    broadcaster: Broadcaster,
    cancellation: CancellationToken,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(listen_addr).await?;
    tracing::info!(addr = listen_addr, "carrier-state callback listening");
    loop {
        tokio::select! {
            _ = cancellation.cancelled() => return Ok(()),
            accepted = listener.accept() => {
                let (stream, peer) = accepted?;
                let repository = repository.clone();
                let link_manager = link_manager.clone();
                let broadcaster = broadcaster.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, &repository, &link_manager, &broadcaster).await {
                        warn!(%peer, error = %e, "carrier-state callback connection failed");
                    }
                });
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum HandlerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed request")]
    Malformed,
}

async fn handle_connection<C: netlab_core::Clock>(
    mut stream: TcpStream,
    repository: &Repository,
    link_manager: &LinkManager<C>,
    broadcaster: &Broadcaster,
) -> Result<(), HandlerError> {
    let request = read_request(&mut stream).await?;
    let (status, body) = match dispatch(&request, repository, link_manager, broadcaster).await {
        Ok(()) => (204, String::new()),
        Err(DispatchError::NotFound) => (404, "not found".to_string()),
        Err(DispatchError::BadRequest(msg)) => (400, msg),
        Err(DispatchError::Engine(e)) => (422, e.to_string()),
    };
    write_response(&mut stream, status, &body).await?;
    Ok(())
}

struct ParsedRequest {
    method: String,
    path: String,
    body: Vec<u8>,
}

/// Reads just enough HTTP/1.1 to extract the method, path, and
/// Content-Length body: the request line, headers up to the blank line,
/// then exactly `Content-Length` more bytes.
async fn read_request(stream: &mut TcpStream) -> Result<ParsedRequest, HandlerError> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    let header_end = loop {
        if buf.len() > MAX_REQUEST_BYTES {
            return Err(HandlerError::Malformed);
        }
        if let Some(pos) = find_header_end(&buf) {
            break pos;
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(HandlerError::Malformed);
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = std::str::from_utf8(&buf[..header_end]).map_err(|_| HandlerError::Malformed)?;
    let mut lines = head.split("\r\n");
    let request_line = lines.next().ok_or(HandlerError::Malformed)?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().ok_or(HandlerError::Malformed)?.to_string();
    let path = parts.next().ok_or(HandlerError::Malformed)?.to_string();

    let content_length: usize = lines
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.trim().eq_ignore_ascii_case("content-length") {
                value.trim().parse().ok()
            } else {
                None
            }
        })
        .unwrap_or(0);

    let body_start = header_end + 4;
    let mut body = buf[body_start.min(buf.len())..].to_vec();
    while body.len() < content_length {
        if body.len() + body_start > MAX_REQUEST_BYTES {
            return Err(HandlerError::Malformed);
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(HandlerError::Malformed);
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(content_length);

    Ok(ParsedRequest { method, path, body })
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

async fn write_response(stream: &mut TcpStream, status: u16, body: &str) -> std::io::Result<()> {
    let reason = match status {
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        422 => "Unprocessable Entity",
        _ => "Internal Server Error",
    };
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

enum DispatchError {
    NotFound,
    BadRequest(String),
    Engine(netlab_engine::EngineError),
}

impl From<netlab_engine::EngineError> for DispatchError {
    fn from(e: netlab_engine::EngineError) -> Self {
        DispatchError::Engine(e)
    }
}

async fn dispatch<C: netlab_core::Clock>(
    request: &ParsedRequest,
    repository: &Repository,
    link_manager: &LinkManager<C>,
    broadcaster: &Broadcaster,
) -> Result<(), DispatchError> {
    if request.method != "POST" || request.path != "/callbacks/carrier-state" {
        return Err(DispatchError::NotFound);
    }

    let callback: CarrierStateCallback =
        serde_json::from_slice(&request.body).map_err(|e| DispatchError::BadRequest(e.to_string()))?;

    apply(repository, link_manager, broadcaster, callback).await
}

async fn apply<C: netlab_core::Clock>(
    repository: &Repository,
    link_manager: &LinkManager<C>,
    broadcaster: &Broadcaster,
    callback: CarrierStateCallback,
) -> Result<(), DispatchError> {
    let link_state_id = link_manager
        .apply_carrier_report(callback.lab_id, &callback.node, &callback.interface, callback.carrier_state)
        .await?;

    if let Some(link_state) = repository.get_link_state(&link_state_id) {
        publish_link_state(broadcaster, callback.lab_id, &link_state);
    }
    Ok(())
}

fn publish_link_state(broadcaster: &Broadcaster, lab_id: LabId, link_state: &netlab_core::LinkState) {
    let frame = netlab_wire::BroadcastFrame::new(
        chrono::Utc::now(),
        BroadcastData::LinkState {
            lab_id,
            link_state_id: link_state.id,
            actual_state: link_state.actual_state.to_string(),
            source_oper_state: link_state.source_oper.state.to_string(),
            source_oper_reason: link_state.source_oper.reason.to_string(),
            target_oper_state: link_state.target_oper.state.to_string(),
            target_oper_reason: link_state.target_oper.reason.to_string(),
            oper_epoch: link_state.oper_epoch,
        },
    );
    broadcaster.publish(lab_id, frame);
}

#[cfg(test)]
mod tests {
    use super::*;
    use netlab_adapters::RuntimeRouter;
    use netlab_core::{CarrierState, FakeClock, Link, LinkEndpoint, LinkId, LinkState, NodeId};
    use netlab_engine::LinkReservations;
    use netlab_storage::Event;
    use tempfile::tempdir;

    async fn repository() -> Arc<Repository> {
        let dir = tempdir().unwrap();
        Arc::new(Repository::open(dir.keep().join("wal.jsonl"), 0).unwrap())
    }

    #[tokio::test]
    async fn carrier_callback_updates_state_and_broadcasts() {
        let repo = repository().await;
        let router = Arc::new(RuntimeRouter::new());
        let reservations = Arc::new(LinkReservations::new(repo.clone(), LinkReservations::default_normaliser()));
        let link_manager = Arc::new(LinkManager::new(repo.clone(), router, reservations, FakeClock::new()));
        let broadcaster = Broadcaster::new();

        let lab_id = LabId::new();
        let (a, b) = (NodeId::new(), NodeId::new());
        let link = Link {
            id: LinkId::new(),
            lab_id,
            link_name: "r1-r2".into(),
            source: LinkEndpoint { node_id: a, node_name: "r1".into(), interface: "eth1".into() },
            target: LinkEndpoint { node_id: b, node_name: "r2".into(), interface: "eth1".into() },
            mtu: None,
        };
        let link_state = LinkState::new(lab_id, &link);
        repo.apply(Event::LinkStateCreated {
            lab_id,
            link_state_id: link_state.id,
            link_definition_id: Some(link.id),
            link_name: link.link_name.clone(),
            source: link.source.clone(),
            target: link.target.clone(),
        })
        .await
        .unwrap();

        let mut rx = broadcaster.subscribe(lab_id);
        let callback = CarrierStateCallback {
            lab_id,
            node: "r1".into(),
            interface: "eth1".into(),
            carrier_state: CarrierState::On,
        };

        apply(&repo, &link_manager, &broadcaster, callback).await.map_err(|_| ()).unwrap();

        let stored = repo.get_link_state(&link_state.id).unwrap();
        assert_eq!(stored.source_carrier_state, CarrierState::On);

        let frame = rx.try_recv().unwrap();
        assert!(matches!(frame.data, BroadcastData::LinkState { .. }));
    }

    #[test]
    fn finds_header_end_at_the_blank_line() {
        let buf = b"POST / HTTP/1.1\r\nContent-Length: 2\r\n\r\n{}";
        assert_eq!(find_header_end(buf), Some(37));
    }
}
