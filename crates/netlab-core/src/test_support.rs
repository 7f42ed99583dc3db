// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Proptest strategies over the core enums, shared by every crate's
//! property tests so they don't each hand-roll an `Arbitrary`-style impl.

use crate::link::LinkActualState;
use crate::node::{NodeActualState, NodeDesiredState};
use proptest::prelude::*;

pub fn node_actual_state() -> impl Strategy<Value = NodeActualState> {
    prop_oneof![
        Just(NodeActualState::Undeployed),
        Just(NodeActualState::Pending),
        Just(NodeActualState::Starting),
        Just(NodeActualState::Running),
        Just(NodeActualState::Stopping),
        Just(NodeActualState::Stopped),
        Just(NodeActualState::Exited),
        Just(NodeActualState::Error),
    ]
}

pub fn node_desired_state() -> impl Strategy<Value = NodeDesiredState> {
    prop_oneof![Just(NodeDesiredState::Running), Just(NodeDesiredState::Stopped)]
}

pub fn link_actual_state() -> impl Strategy<Value = LinkActualState> {
    prop_oneof![
        Just(LinkActualState::Unknown),
        Just(LinkActualState::Pending),
        Just(LinkActualState::Creating),
        Just(LinkActualState::Up),
        Just(LinkActualState::Down),
        Just(LinkActualState::Error),
    ]
}
