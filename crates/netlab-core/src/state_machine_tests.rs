// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::link::LinkDesiredState;
use crate::node::NodeDesiredState;

#[test]
fn self_transitions_always_permitted() {
    for s in [
        NodeActualState::Undeployed,
        NodeActualState::Running,
        NodeActualState::Error,
    ] {
        assert!(NodeStateMachine::can_transition(s, s));
    }
}

#[test]
fn node_legal_transitions_match_table() {
    assert!(NodeStateMachine::can_transition(NodeActualState::Undeployed, NodeActualState::Pending));
    assert!(!NodeStateMachine::can_transition(NodeActualState::Undeployed, NodeActualState::Running));
    assert!(NodeStateMachine::can_transition(NodeActualState::Exited, NodeActualState::Pending));
    assert!(!NodeStateMachine::can_transition(NodeActualState::Running, NodeActualState::Undeployed));
}

#[test]
fn enforcement_action_start_when_stopped_and_desired_running() {
    let action = NodeStateMachine::get_enforcement_action(
        NodeActualState::Stopped,
        NodeDesiredState::Running,
    );
    assert_eq!(action, Some(NodeCommand::Start));
}

#[test]
fn enforcement_action_stop_when_running_and_desired_stopped() {
    let action = NodeStateMachine::get_enforcement_action(
        NodeActualState::Running,
        NodeDesiredState::Stopped,
    );
    assert_eq!(action, Some(NodeCommand::Stop));
}

#[test]
fn enforcement_action_none_while_transitional() {
    assert_eq!(
        NodeStateMachine::get_enforcement_action(NodeActualState::Starting, NodeDesiredState::Running),
        None
    );
}

#[test]
fn needs_enforcement_false_for_transitional_states() {
    assert!(!NodeStateMachine::needs_enforcement(NodeActualState::Pending, NodeDesiredState::Running));
}

#[test]
fn needs_enforcement_true_when_terminal_and_mismatched() {
    assert!(NodeStateMachine::needs_enforcement(NodeActualState::Stopped, NodeDesiredState::Running));
}

#[test]
fn transition_for_desired_running_from_undeployed_is_pending() {
    assert_eq!(
        NodeStateMachine::get_transition_for_desired(NodeActualState::Undeployed, NodeDesiredState::Running),
        Some(NodeActualState::Pending)
    );
}

#[test]
fn transition_for_desired_stopped_from_pending_aborts_to_undeployed() {
    assert_eq!(
        NodeStateMachine::get_transition_for_desired(NodeActualState::Pending, NodeDesiredState::Stopped),
        Some(NodeActualState::Undeployed)
    );
}

#[test]
fn command_guard_rejects_start_while_stopping() {
    let (ok, reason) = NodeStateMachine::can_accept_command(NodeActualState::Stopping, NodeCommand::Start);
    assert!(!ok);
    assert!(reason.is_some());
}

#[test]
fn command_guard_rejects_stop_while_starting() {
    let (ok, _) = NodeStateMachine::can_accept_command(NodeActualState::Starting, NodeCommand::Stop);
    assert!(!ok);
}

#[test]
fn command_guard_allows_start_while_stopped() {
    let (ok, reason) = NodeStateMachine::can_accept_command(NodeActualState::Stopped, NodeCommand::Start);
    assert!(ok);
    assert!(reason.is_none());
}

#[test]
fn bulk_classification_skip_transitional() {
    assert_eq!(
        NodeStateMachine::can_accept_bulk_command(NodeActualState::Starting, NodeCommand::Start),
        BulkCommandOutcome::SkipTransitional
    );
}

#[test]
fn bulk_classification_already_in_state() {
    assert_eq!(
        NodeStateMachine::can_accept_bulk_command(NodeActualState::Running, NodeCommand::Start),
        BulkCommandOutcome::AlreadyInState
    );
    assert_eq!(
        NodeStateMachine::can_accept_bulk_command(NodeActualState::Undeployed, NodeCommand::Stop),
        BulkCommandOutcome::AlreadyInState
    );
}

#[test]
fn bulk_classification_reset_and_proceed_on_error_start() {
    assert_eq!(
        NodeStateMachine::can_accept_bulk_command(NodeActualState::Error, NodeCommand::Start),
        BulkCommandOutcome::ResetAndProceed
    );
}

#[test]
fn bulk_classification_proceed_otherwise() {
    assert_eq!(
        NodeStateMachine::can_accept_bulk_command(NodeActualState::Stopped, NodeCommand::Start),
        BulkCommandOutcome::Proceed
    );
}

#[test]
fn needs_sync_false_when_already_converging() {
    assert!(!NodeStateMachine::needs_sync(NodeActualState::Starting, NodeCommand::Start));
}

#[test]
fn needs_sync_true_when_stuck_elsewhere() {
    assert!(NodeStateMachine::needs_sync(NodeActualState::Error, NodeCommand::Start));
}

#[test]
fn display_state_collapses_pending_by_desired() {
    assert_eq!(
        NodeStateMachine::compute_display_state(NodeActualState::Pending, NodeDesiredState::Running),
        NodeActualState::Starting
    );
    assert_eq!(
        NodeStateMachine::compute_display_state(NodeActualState::Pending, NodeDesiredState::Stopped),
        NodeActualState::Stopped
    );
}

#[test]
fn display_state_collapses_running_desired_stopped_to_stopping() {
    assert_eq!(
        NodeStateMachine::compute_display_state(NodeActualState::Running, NodeDesiredState::Stopped),
        NodeActualState::Stopping
    );
}

#[test]
fn display_state_identity_for_exited_when_desired_stopped() {
    // exited+desired=stopped isn't special-cased so it falls through to the
    // identity arm only if exited is one of the listed passthrough states;
    // it isn't, so this resolves to error per the unmappable clause.
    assert_eq!(
        NodeStateMachine::compute_display_state(NodeActualState::Exited, NodeDesiredState::Stopped),
        NodeActualState::Error
    );
}

#[test]
fn link_legal_transitions_match_table() {
    assert!(LinkStateMachine::can_transition(LinkActualState::Unknown, LinkActualState::Pending));
    assert!(!LinkStateMachine::can_transition(LinkActualState::Up, LinkActualState::Creating));
    assert!(LinkStateMachine::can_transition(LinkActualState::Error, LinkActualState::Up));
}

#[test]
fn should_auto_connect_true_when_both_nodes_running_and_link_connectable() {
    assert!(LinkStateMachine::should_auto_connect(
        LinkDesiredState::Up,
        NodeActualState::Running,
        NodeActualState::Running,
        LinkActualState::Down,
    ));
}

#[test]
fn should_auto_connect_false_when_link_already_up() {
    assert!(!LinkStateMachine::should_auto_connect(
        LinkDesiredState::Up,
        NodeActualState::Running,
        NodeActualState::Running,
        LinkActualState::Up,
    ));
}

#[test]
fn should_auto_connect_false_when_a_node_not_running() {
    assert!(!LinkStateMachine::should_auto_connect(
        LinkDesiredState::Up,
        NodeActualState::Running,
        NodeActualState::Pending,
        LinkActualState::Down,
    ));
}

#[test]
fn lab_aggregate_any_error_wins() {
    let counts = NodeStateCounts { running: 3, error: 1, ..Default::default() };
    assert_eq!(LabStateMachine::compute_lab_state(counts), LabState::Error);
}

#[test]
fn lab_aggregate_pure_running() {
    let counts = NodeStateCounts { running: 3, ..Default::default() };
    assert_eq!(LabStateMachine::compute_lab_state(counts), LabState::Running);
}

#[test]
fn lab_aggregate_mixed_running_stopped_is_running() {
    let counts = NodeStateCounts { running: 1, stopped: 2, ..Default::default() };
    assert_eq!(LabStateMachine::compute_lab_state(counts), LabState::Running);
}

#[test]
fn lab_aggregate_empty_is_stopped() {
    assert_eq!(LabStateMachine::compute_lab_state(NodeStateCounts::default()), LabState::Stopped);
}

#[test]
fn lab_aggregate_any_stopping_wins_over_starting() {
    let counts = NodeStateCounts { stopping: 1, starting: 1, ..Default::default() };
    assert_eq!(LabStateMachine::compute_lab_state(counts), LabState::Stopping);
}

#[test]
fn is_transitional_true_for_starting_and_stopping() {
    assert!(LabStateMachine::is_transitional(LabState::Starting));
    assert!(LabStateMachine::is_transitional(LabState::Stopping));
    assert!(!LabStateMachine::is_transitional(LabState::Running));
}
