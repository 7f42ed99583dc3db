// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pub/sub fan-out of state-change events keyed by lab id (§4.3).
//!
//! One `tokio::sync::broadcast` channel per lab, created lazily on first
//! subscribe or publish and dropped once its subscriber count hits zero.
//! Publishing never blocks and never fails the caller: an unreachable bus
//! (no subscribers, or — in a multi-replica deployment — the cross-process
//! transport behind it) is swallowed and logged at warn, exactly as §4.3
//! requires.

use netlab_core::LabId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

use netlab_wire::BroadcastFrame;

const CHANNEL_CAPACITY: usize = 256;

/// Fans out [`BroadcastFrame`]s to every subscriber of a given lab.
///
/// This is the per-process half of §4.3's pub/sub bus. The spec also
/// calls for a cross-process channel so a deployment with multiple API
/// replicas delivers every event to every connected WebSocket; that
/// transport is an external dependency this crate doesn't provide, so
/// [`Broadcaster`] is written as the seam a cross-process publisher would
/// plug into (`publish` is the only write path), not as the transport
/// itself.
#[derive(Clone, Default)]
pub struct Broadcaster {
    channels: Arc<Mutex<HashMap<LabId, broadcast::Sender<BroadcastFrame>>>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    fn sender_for(&self, lab_id: LabId) -> broadcast::Sender<BroadcastFrame> {
        self.channels
            .lock()
            .entry(lab_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }

    /// Subscribes to `lab_id`'s channel, creating it if this is the first
    /// subscriber.
    pub fn subscribe(&self, lab_id: LabId) -> broadcast::Receiver<BroadcastFrame> {
        self.sender_for(lab_id).subscribe()
    }

    /// Publishes `frame` to every current subscriber of `lab_id`. A
    /// channel with no subscribers (or one whose receivers have all been
    /// dropped) drops the frame silently — delivery ordering within a
    /// channel is preserved by `tokio::sync::broadcast`.
    pub fn publish(&self, lab_id: LabId, frame: BroadcastFrame) {
        let sender = self.sender_for(lab_id);
        if sender.send(frame).is_err() {
            tracing::warn!(%lab_id, "broadcast has no subscribers; frame dropped");
        }
    }

    /// Drops the channel for `lab_id` once nothing is subscribed, so a
    /// long-lived process doesn't accumulate one `broadcast::Sender` per
    /// lab ever created. Safe to call even if subscribers remain — it's a
    /// no-op in that case.
    pub fn prune(&self, lab_id: LabId) {
        let mut channels = self.channels.lock();
        if let Some(sender) = channels.get(&lab_id) {
            if sender.receiver_count() == 0 {
                channels.remove(&lab_id);
            }
        }
    }
}
