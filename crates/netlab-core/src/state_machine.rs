// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure, side-effect-free state-transition rules for nodes, links, and labs.
//!
//! Nothing in this module talks to an agent, a database, or a clock: every
//! function is a plain mapping from inputs to a decision, so reconciler and
//! job-runner logic can be unit-tested without any of that machinery.

use crate::lab::LabState;
use crate::link::LinkActualState;
use crate::node::{NodeActualState, NodeDesiredState};

/// Bulk start/stop-all classification for a single node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkCommandOutcome {
    SkipTransitional,
    AlreadyInState,
    ResetAndProceed,
    Proceed,
}

/// A single-node start/stop verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeCommand {
    Start,
    Stop,
}

/// Pure rules over [`NodeActualState`]/[`NodeDesiredState`].
pub struct NodeStateMachine;

impl NodeStateMachine {
    /// Terminal states: enforcement only runs against these.
    pub const TERMINAL_STATES: [NodeActualState; 4] = [
        NodeActualState::Running,
        NodeActualState::Stopped,
        NodeActualState::Error,
        NodeActualState::Undeployed,
    ];

    /// States in which a container has already been created.
    pub const CONTAINER_EXISTS_STATES: [NodeActualState; 6] = [
        NodeActualState::Running,
        NodeActualState::Stopped,
        NodeActualState::Stopping,
        NodeActualState::Starting,
        NodeActualState::Exited,
        NodeActualState::Error,
    ];

    /// States functionally equivalent to "not running" for enforcement purposes.
    pub const STOPPED_EQUIVALENT_STATES: [NodeActualState; 4] = [
        NodeActualState::Stopped,
        NodeActualState::Exited,
        NodeActualState::Undeployed,
        NodeActualState::Pending,
    ];

    /// Mid-flight states: enforcement waits rather than acting.
    pub const TRANSITIONAL_STATES: [NodeActualState; 3] = [
        NodeActualState::Pending,
        NodeActualState::Starting,
        NodeActualState::Stopping,
    ];

    /// Whether `from -> to` is one of the legal node transitions.
    /// Self-transitions are always permitted.
    pub fn can_transition(from: NodeActualState, to: NodeActualState) -> bool {
        use NodeActualState::*;
        if from == to {
            return true;
        }
        matches!(
            (from, to),
            (Undeployed, Pending)
                | (Undeployed, Error)
                | (Pending, Starting)
                | (Pending, Running)
                | (Pending, Undeployed)
                | (Pending, Error)
                | (Starting, Running)
                | (Starting, Stopped)
                | (Starting, Error)
                | (Running, Stopping)
                | (Running, Stopped)
                | (Running, Error)
                | (Stopping, Stopped)
                | (Stopping, Error)
                | (Stopped, Starting)
                | (Stopped, Pending)
                | (Stopped, Undeployed)
                | (Stopped, Error)
                | (Exited, Starting)
                | (Exited, Pending)
                | (Exited, Stopped)
                | (Exited, Error)
                | (Error, Pending)
                | (Error, Starting)
                | (Error, Stopped)
                | (Error, Undeployed)
        )
    }

    /// The concrete next `actual_state` to request given `(current, desired)`.
    /// `None` means no transition is warranted.
    pub fn get_transition_for_desired(
        current: NodeActualState,
        desired: NodeDesiredState,
    ) -> Option<NodeActualState> {
        use NodeActualState::*;
        match (desired, current) {
            (NodeDesiredState::Running, Undeployed) => Some(Pending),
            (NodeDesiredState::Running, Pending) => Some(Starting),
            (NodeDesiredState::Running, Stopped) => Some(Starting),
            (NodeDesiredState::Running, Exited) => Some(Starting),
            (NodeDesiredState::Running, Error) => Some(Pending),
            (NodeDesiredState::Stopped, Running) => Some(Stopping),
            (NodeDesiredState::Stopped, Pending) => Some(Undeployed),
            _ => None,
        }
    }

    /// The enforcement verb for `(actual, desired)`, or `None` if no action
    /// is warranted right now.
    pub fn get_enforcement_action(
        actual: NodeActualState,
        desired: NodeDesiredState,
    ) -> Option<NodeCommand> {
        if Self::TRANSITIONAL_STATES.contains(&actual) {
            return None;
        }
        match desired {
            NodeDesiredState::Running
                if Self::STOPPED_EQUIVALENT_STATES.contains(&actual)
                    || actual == NodeActualState::Error =>
            {
                Some(NodeCommand::Start)
            }
            NodeDesiredState::Stopped if actual == NodeActualState::Running => {
                Some(NodeCommand::Stop)
            }
            _ => None,
        }
    }

    /// Whether enforcement should even run: actual is terminal and mismatched
    /// against desired.
    pub fn needs_enforcement(actual: NodeActualState, desired: NodeDesiredState) -> bool {
        Self::TERMINAL_STATES.contains(&actual)
            && Self::get_enforcement_action(actual, desired).is_some()
    }

    /// Command guards: rejects `start` while
    /// `stopping` and `stop` while `starting`, each with a reason.
    pub fn can_accept_command(actual: NodeActualState, command: NodeCommand) -> (bool, Option<&'static str>) {
        match (command, actual) {
            (NodeCommand::Start, NodeActualState::Stopping) => {
                (false, Some("node is stopping; cannot start until it settles"))
            }
            (NodeCommand::Stop, NodeActualState::Starting) => {
                (false, Some("node is starting; cannot stop until it settles"))
            }
            _ => (true, None),
        }
    }

    /// Bulk start/stop-all classification for one node.
    pub fn can_accept_bulk_command(actual: NodeActualState, command: NodeCommand) -> BulkCommandOutcome {
        if Self::TRANSITIONAL_STATES.contains(&actual) {
            return BulkCommandOutcome::SkipTransitional;
        }
        match command {
            NodeCommand::Start if actual == NodeActualState::Running => {
                BulkCommandOutcome::AlreadyInState
            }
            NodeCommand::Stop
                if actual == NodeActualState::Stopped || actual == NodeActualState::Undeployed =>
            {
                BulkCommandOutcome::AlreadyInState
            }
            NodeCommand::Start if actual == NodeActualState::Error => {
                BulkCommandOutcome::ResetAndProceed
            }
            _ => BulkCommandOutcome::Proceed,
        }
    }

    /// Whether, after issuing `command` in bulk, this node needs an explicit
    /// `sync:node:<id>` job because it isn't already converging on its own.
    pub fn needs_sync(actual: NodeActualState, command: NodeCommand) -> bool {
        use NodeActualState::*;
        let expected = match command {
            NodeCommand::Start => &[Running, Pending, Starting][..],
            NodeCommand::Stop => &[Stopped, Undeployed, Stopping][..],
        };
        !expected.contains(&actual)
    }

    /// Collapses the eight actual states down to the five the UI shows.
    pub fn compute_display_state(actual: NodeActualState, desired: NodeDesiredState) -> NodeActualState {
        use NodeActualState::*;
        match (actual, desired) {
            (Pending, NodeDesiredState::Running) => Starting,
            (Pending, NodeDesiredState::Stopped) => Stopped,
            (Running, NodeDesiredState::Stopped) => Stopping,
            (Stopped | Exited | Undeployed, NodeDesiredState::Running) => Starting,
            (other, _)
                if matches!(other, Starting | Running | Stopping | Stopped | Error) =>
            {
                other
            }
            _ => Error,
        }
    }
}

/// Pure rules over [`LinkActualState`].
pub struct LinkStateMachine;

impl LinkStateMachine {
    /// `connectable` states a link may be auto-connected from: not already
    /// up, and not mid-creation.
    pub const CONNECTABLE_STATES: [LinkActualState; 4] = [
        LinkActualState::Unknown,
        LinkActualState::Pending,
        LinkActualState::Down,
        LinkActualState::Error,
    ];

    /// Whether `from -> to` is a legal link transition.
    /// Self-transitions are always permitted.
    pub fn can_transition(from: LinkActualState, to: LinkActualState) -> bool {
        use LinkActualState::*;
        if from == to {
            return true;
        }
        matches!(
            (from, to),
            (Unknown, Pending)
                | (Unknown, Up)
                | (Unknown, Down)
                | (Pending, Creating)
                | (Pending, Up)
                | (Pending, Error)
                | (Creating, Up)
                | (Creating, Down)
                | (Creating, Error)
                | (Up, Down)
                | (Up, Error)
                | (Down, Pending)
                | (Down, Up)
                | (Down, Error)
                | (Error, Pending)
                | (Error, Down)
                | (Error, Up)
        )
    }

    /// Whether a link is eligible for an auto-connect attempt right now.
    pub fn should_auto_connect(
        desired: crate::link::LinkDesiredState,
        source_node_actual: NodeActualState,
        target_node_actual: NodeActualState,
        link_actual: LinkActualState,
    ) -> bool {
        desired == crate::link::LinkDesiredState::Up
            && source_node_actual == NodeActualState::Running
            && target_node_actual == NodeActualState::Running
            && Self::CONNECTABLE_STATES.contains(&link_actual)
    }
}

/// Per-node actual-state tallies used to derive a lab's aggregate state.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeStateCounts {
    pub running: u32,
    pub stopped: u32,
    pub undeployed: u32,
    pub error: u32,
    pub pending: u32,
    pub starting: u32,
    pub stopping: u32,
}

impl NodeStateCounts {
    pub fn total(&self) -> u32 {
        self.running
            + self.stopped
            + self.undeployed
            + self.error
            + self.pending
            + self.starting
            + self.stopping
    }
}

/// Pure rules for deriving a lab's aggregate state from its nodes.
pub struct LabStateMachine;

impl LabStateMachine {
    /// Computes the aggregate lab state from per-node actual-state counts.
    pub fn compute_lab_state(counts: NodeStateCounts) -> LabState {
        if counts.error > 0 {
            return LabState::Error;
        }
        if counts.stopping > 0 {
            return LabState::Stopping;
        }
        if counts.starting > 0 || counts.pending > 0 {
            return LabState::Starting;
        }
        if counts.total() == 0 {
            return LabState::Stopped;
        }
        if counts.running > 0 && counts.stopped == 0 && counts.undeployed == 0 {
            return LabState::Running;
        }
        if counts.running == 0 {
            return LabState::Stopped;
        }
        // mixed running/stopped
        LabState::Running
    }

    /// Whether a lab state should suppress enforcement/UI polling because
    /// it's mid-flight.
    pub fn is_transitional(state: LabState) -> bool {
        matches!(state, LabState::Starting | LabState::Stopping)
    }
}

#[cfg(test)]
#[path = "state_machine_tests.rs"]
mod tests;
