// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bidirectional byte proxying for console passthrough (§4.2, §6): the
//! controller opens a WebSocket to the owning agent's console endpoint,
//! then shuttles raw bytes between it and whatever speaks to the other
//! end (netlab-daemon's browser-facing WebSocket).
//!
//! [`ByteDuplex`] is the seam: the agent-side connection here and the
//! browser-side connection in `netlab-daemon::ws_gateway` both implement
//! it, so [`proxy`] doesn't care which concrete transport is on either
//! side.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

/// One side of a bidirectional byte proxy: receive the next chunk of
/// console output/input, or send one.
#[async_trait]
pub trait ByteDuplex: Send {
    /// `None` means the peer closed the connection.
    async fn recv(&mut self) -> Option<Vec<u8>>;
    async fn send(&mut self, bytes: Vec<u8>) -> bool;
}

/// The controller → agent leg of the console proxy: a WebSocket dialed
/// against the agent's console endpoint.
pub struct ConsoleStream {
    inner: WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
}

impl ConsoleStream {
    pub fn new(inner: WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl ByteDuplex for ConsoleStream {
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

/// Runs the proxy loop until either side closes: every chunk received on
/// `a` is sent to `b` and vice versa, concurrently. No timeout — console
/// sessions are expected to live for as long as the user has it open
/// (§5 "Cancellation & timeouts" scopes RPC timeouts to agent calls, not
/// this passthrough).
pub async fn proxy(mut a: impl ByteDuplex, mut b: impl ByteDuplex) {
    loop {
        tokio::select! {
            chunk = a.recv() => {
                match chunk {
                    Some(bytes) => if !b.send(bytes).await { return; },
                    None => return,
                }
            }
            chunk = b.recv() => {
                match chunk {
                    Some(bytes) => if !a.send(bytes).await { return; },
                    None => return,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// An in-memory duplex for testing `proxy` without a real socket.
    struct FakeDuplex {
        inbound: Arc<Mutex<VecDeque<Vec<u8>>>>,
        outbound: Arc<Mutex<VecDeque<Vec<u8>>>>,
    }

    #[async_trait]
    impl ByteDuplex for FakeDuplex {
        async fn recv(&mut self) -> Option<Vec<u8>> {
            self.inbound.lock().unwrap().pop_front()
        }

        async fn send(&mut self, bytes: Vec<u8>) -> bool {
            self.outbound.lock().unwrap().push_back(bytes);
            true
        }
    }

    #[tokio::test]
    async fn forwards_one_chunk_then_stops_when_both_sides_are_empty() {
        let a_in = Arc::new(Mutex::new(VecDeque::from([b"hello".to_vec()])));
        let a_out = Arc::new(Mutex::new(VecDeque::new()));
        let b_in: Arc<Mutex<VecDeque<Vec<u8>>>> = Arc::new(Mutex::new(VecDeque::new()));
        let b_out = Arc::new(Mutex::new(VecDeque::new()));

        let a = FakeDuplex { inbound: a_in.clone(), outbound: a_out.clone() };
        let b = FakeDuplex { inbound: b_in.clone(), outbound: b_out.clone() };

        // Both recv() return None after the first chunk, so the loop exits
        // on the next iteration without needing an explicit close signal.
        proxy(a, b).await;

        assert_eq!(b_out.lock().unwrap().pop_front(), Some(b"hello".to_vec()));
    }
}
