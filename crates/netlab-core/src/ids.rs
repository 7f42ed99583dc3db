// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Newtype identifiers for every entity in the data model.

crate::define_id! {
    /// Identifies a Lab.
    pub struct LabId("lab-");
}

crate::define_id! {
    /// Identifies a Node declaration within a lab.
    pub struct NodeId("nod-");
}

crate::define_id! {
    /// Identifies a Link declaration within a lab.
    pub struct LinkId("lnk-");
}

crate::define_id! {
    /// Identifies a LinkState row (one per declared Link).
    pub struct LinkStateId("lks-");
}

crate::define_id! {
    /// Identifies a registered agent Host.
    pub struct HostId("hst-");
}

crate::define_id! {
    /// Identifies a Job (deploy/destroy/sync/node-action).
    pub struct JobId("job-");
}

crate::define_id! {
    /// Identifies a VxlanTunnel row.
    pub struct TunnelId("vxt-");
}

crate::define_id! {
    /// Identifies a LinkEndpointReservation row.
    pub struct ReservationId("res-");
}

crate::define_id! {
    /// Identifies a pending debounce/deadline timer scheduled through an [`crate::effect::Effect`].
    pub struct TimerId("tmr-");
}
