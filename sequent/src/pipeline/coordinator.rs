//! Per-group cursor state and the gates built from it.
//!
//! Each handler group owns a [`GroupCell`]: its cursor, its lifecycle
//! state and, once it has failed, the captured [`Fault`]. A
//! [`DependencyGate`] bundles the cursors a waiter depends on and
//! resolves their minimum; the same gate type serves both worker
//! dependency waits and the publisher's backpressure floor. The
//! [`CursorCoordinator`] wires cells and gates up from a resolved
//! [`WorkflowGraph`] and is the lookup surface for status queries.

use std::collections::HashMap;
use std::fmt;
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::futures::Notified;
use tracing::warn;

use crate::core::SOURCE;
use crate::graph::WorkflowGraph;
use crate::store::Cursor;

// ============================================================================
// Group Lifecycle
// ============================================================================

/// Lifecycle state of a handler group.
///
/// Groups move `Idle -> Running` when their worker starts, and from
/// `Running` to either `Faulted` (a handler returned an error) or
/// `Stopped` (cooperative shutdown). `Faulted` is terminal until an
/// explicit restart puts the group back through `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupState {
    /// Built but not yet polled by its worker.
    Idle,
    /// Actively consuming events.
    Running,
    /// A handler failed; the cursor is frozen at the last completed
    /// sequence until the group is restarted.
    Faulted,
    /// Shut down cooperatively.
    Stopped,
}

impl GroupState {
    fn as_u8(self) -> u8 {
        match self {
            GroupState::Idle => 0,
            GroupState::Running => 1,
            GroupState::Faulted => 2,
            GroupState::Stopped => 3,
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => GroupState::Idle,
            1 => GroupState::Running,
            2 => GroupState::Faulted,
            _ => GroupState::Stopped,
        }
    }
}

impl fmt::Display for GroupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            GroupState::Idle => "idle",
            GroupState::Running => "running",
            GroupState::Faulted => "faulted",
            GroupState::Stopped => "stopped",
        };
        f.write_str(label)
    }
}

/// Capture of a handler failure: which handler, which sequence, and the
/// error it reported.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("handler '{handler}' in group '{group}' failed at sequence {sequence}: {message}")]
pub struct Fault {
    /// Group the failing handler belongs to.
    pub group: String,
    /// Registered name of the failing handler.
    pub handler: String,
    /// Sequence whose event was being processed.
    pub sequence: i64,
    /// Stringified handler error.
    pub message: String,
}

/// Point-in-time view of one group, as returned by status queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupStatus {
    /// Group name.
    pub group: String,
    /// Lifecycle state at the time of the query.
    pub state: GroupState,
    /// Highest sequence the group has fully processed, -1 before the
    /// first one.
    pub cursor: i64,
    /// The captured failure, present only while the group is faulted.
    pub fault: Option<Fault>,
}

// ============================================================================
// Group Cell
// ============================================================================

/// Runtime state owned by one handler group.
///
/// The cursor is written only by the group's worker; everyone else
/// reads it. State transitions are worker-driven except for the
/// restart path, which only runs once the worker task has already
/// exited.
pub(crate) struct GroupCell {
    name: String,
    cursor: Arc<Cursor>,
    state: AtomicU8,
    fault: Mutex<Option<Fault>>,
}

impl GroupCell {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cursor: Arc::new(Cursor::new()),
            state: AtomicU8::new(GroupState::Idle.as_u8()),
            fault: Mutex::new(None),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn cursor(&self) -> &Arc<Cursor> {
        &self.cursor
    }

    pub(crate) fn state(&self) -> GroupState {
        GroupState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: GroupState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    /// Records the failure and moves the group to `Faulted`. The fault
    /// is stored before the state flips, so any observer that sees
    /// `Faulted` also sees the fault.
    pub(crate) fn record_fault(&self, fault: Fault) {
        *self
            .fault
            .lock()
            .expect("fault Mutex poisoned - unrecoverable state") = Some(fault);
        self.set_state(GroupState::Faulted);
    }

    /// Drops the captured fault and returns the group to `Idle`, ready
    /// for a fresh worker. The cursor keeps its last completed value.
    pub(crate) fn clear_fault(&self) {
        *self
            .fault
            .lock()
            .expect("fault Mutex poisoned - unrecoverable state") = None;
        self.set_state(GroupState::Idle);
    }

    pub(crate) fn status(&self) -> GroupStatus {
        GroupStatus {
            group: self.name.clone(),
            state: self.state(),
            cursor: self.cursor.get(),
            fault: self
                .fault
                .lock()
                .expect("fault Mutex poisoned - unrecoverable state")
                .clone(),
        }
    }
}

impl fmt::Debug for GroupCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupCell")
            .field("name", &self.name)
            .field("state", &self.state())
            .field("cursor", &self.cursor.get())
            .finish()
    }
}

// ============================================================================
// Dependency Gate
// ============================================================================

/// The set of cursors a waiter may not overtake.
///
/// A gate's value is the minimum of its cursors: a sequence is safe to
/// consume once every gated cursor has passed it. Workers gate on their
/// resolved dependencies (the source cursor for root groups); the
/// publish path gates on every group cursor to bound how far the
/// producer can run ahead.
#[derive(Clone)]
pub(crate) struct DependencyGate {
    cursors: Box<[Arc<Cursor>]>,
}

impl DependencyGate {
    pub(crate) fn new(cursors: Vec<Arc<Cursor>>) -> Self {
        debug_assert!(!cursors.is_empty(), "gate must cover at least one cursor");
        Self {
            cursors: cursors.into_boxed_slice(),
        }
    }

    /// Minimum of the gated cursors.
    pub(crate) fn current(&self) -> i64 {
        self.cursors
            .iter()
            .map(|cursor| cursor.get())
            .min()
            .unwrap_or(Cursor::INITIAL)
    }

    /// Suspends until the gate has moved past `seq`, returning the
    /// observed minimum (`> seq`).
    ///
    /// Wakeup registration happens on every cursor before the minimum
    /// is read, so an advance that lands between the check and the
    /// suspension still wakes the waiter. When `liveness_timeout` is
    /// set and elapses without progress, a warning is logged and the
    /// wait resumes; the timeout never aborts the wait.
    pub(crate) async fn wait_past(
        &self,
        seq: i64,
        liveness_timeout: Option<Duration>,
        waiter: &str,
    ) -> i64 {
        loop {
            let mut pending: Vec<Pin<Box<Notified<'_>>>> = self
                .cursors
                .iter()
                .map(|cursor| Box::pin(cursor.notified()))
                .collect();
            for notified in pending.iter_mut() {
                notified.as_mut().enable();
            }

            let observed = self.current();
            if observed > seq {
                return observed;
            }

            let any_advanced = future::select_all(pending);
            match liveness_timeout {
                Some(limit) => {
                    if tokio::time::timeout(limit, any_advanced).await.is_err() {
                        warn!(
                            "{} still waiting for gated cursors to pass {} (currently {})",
                            waiter, seq, observed
                        );
                    }
                }
                None => {
                    any_advanced.await;
                }
            }
        }
    }
}

impl fmt::Debug for DependencyGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyGate")
            .field("cursors", &self.cursors.len())
            .field("current", &self.current())
            .finish()
    }
}

// ============================================================================
// Cursor Coordinator
// ============================================================================

/// Owns the source cursor and one [`GroupCell`] per group, and builds
/// the gates that tie them together.
///
/// Cells are held in registration order, matching the graph they were
/// built from.
pub(crate) struct CursorCoordinator {
    source: Arc<Cursor>,
    cells: Vec<Arc<GroupCell>>,
    index: HashMap<String, usize>,
}

impl CursorCoordinator {
    pub(crate) fn new(graph: &WorkflowGraph) -> Self {
        let mut cells = Vec::with_capacity(graph.group_count());
        let mut index = HashMap::with_capacity(graph.group_count());
        for name in graph.group_names() {
            index.insert(name.to_string(), cells.len());
            cells.push(Arc::new(GroupCell::new(name)));
        }
        Self {
            source: Arc::new(Cursor::new()),
            cells,
            index,
        }
    }

    /// Cursor advanced by the publish path after each append.
    pub(crate) fn source(&self) -> &Arc<Cursor> {
        &self.source
    }

    pub(crate) fn cell(&self, group: &str) -> Option<&Arc<GroupCell>> {
        self.index.get(group).map(|&slot| &self.cells[slot])
    }

    /// Gate for one group's worker: one cursor per resolved dependency,
    /// the source cursor standing in for the root.
    ///
    /// Returns `None` for names the graph does not know.
    pub(crate) fn gate_for(&self, graph: &WorkflowGraph, group: &str) -> Option<DependencyGate> {
        let dependencies = graph.dependencies_of(group)?;
        let mut cursors = Vec::with_capacity(dependencies.len());
        for dependency in dependencies {
            if dependency == SOURCE {
                cursors.push(Arc::clone(&self.source));
            } else {
                cursors.push(Arc::clone(self.cell(dependency)?.cursor()));
            }
        }
        Some(DependencyGate::new(cursors))
    }

    /// Gate over every group cursor. Its minimum is the backpressure
    /// floor: no live sequence below it is still needed by anyone.
    pub(crate) fn floor_gate(&self) -> DependencyGate {
        DependencyGate::new(
            self.cells
                .iter()
                .map(|cell| Arc::clone(cell.cursor()))
                .collect(),
        )
    }

    pub(crate) fn status(&self, group: &str) -> Option<GroupStatus> {
        self.cell(group).map(|cell| cell.status())
    }

    /// Status of every group, in registration order.
    pub(crate) fn statuses(&self) -> Vec<GroupStatus> {
        self.cells.iter().map(|cell| cell.status()).collect()
    }
}

impl fmt::Debug for CursorCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CursorCoordinator")
            .field("source", &self.source.get())
            .field("groups", &self.cells.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;

    use super::*;
    use crate::core::GroupSpec;
    use crate::graph::GroupRegistry;

    fn resolved(specs: Vec<GroupSpec>) -> WorkflowGraph {
        let mut registry = GroupRegistry::new();
        for spec in specs {
            registry.register(spec).unwrap();
        }
        WorkflowGraph::resolve(&registry.finalize().unwrap()).unwrap()
    }

    #[test]
    fn test_state_repr_roundtrip() {
        for state in [
            GroupState::Idle,
            GroupState::Running,
            GroupState::Faulted,
            GroupState::Stopped,
        ] {
            assert_eq!(GroupState::from_u8(state.as_u8()), state);
        }
    }

    #[test]
    fn test_state_display_lowercase() {
        assert_eq!(GroupState::Faulted.to_string(), "faulted");
        assert_eq!(GroupState::Running.to_string(), "running");
    }

    #[test]
    fn test_record_fault_flips_state_and_keeps_cursor() {
        let cell = GroupCell::new("enrich");
        cell.cursor().advance(7);
        cell.set_state(GroupState::Running);

        cell.record_fault(Fault {
            group: "enrich".to_string(),
            handler: "geoip".to_string(),
            sequence: 8,
            message: "lookup failed".to_string(),
        });

        let status = cell.status();
        assert_eq!(status.state, GroupState::Faulted);
        assert_eq!(status.cursor, 7);
        let fault = status.fault.unwrap();
        assert_eq!(fault.handler, "geoip");
        assert_eq!(fault.sequence, 8);
    }

    #[test]
    fn test_clear_fault_returns_to_idle() {
        let cell = GroupCell::new("enrich");
        cell.record_fault(Fault {
            group: "enrich".to_string(),
            handler: "geoip".to_string(),
            sequence: 0,
            message: "boom".to_string(),
        });
        cell.clear_fault();

        let status = cell.status();
        assert_eq!(status.state, GroupState::Idle);
        assert!(status.fault.is_none());
    }

    #[test]
    fn test_fault_display_names_handler_and_sequence() {
        let fault = Fault {
            group: "audit".to_string(),
            handler: "writer".to_string(),
            sequence: 42,
            message: "disk full".to_string(),
        };
        assert_eq!(
            fault.to_string(),
            "handler 'writer' in group 'audit' failed at sequence 42: disk full"
        );
    }

    #[test]
    fn test_gate_current_is_minimum() {
        let fast = Arc::new(Cursor::new());
        let slow = Arc::new(Cursor::new());
        fast.advance(10);
        slow.advance(3);

        let gate = DependencyGate::new(vec![fast, slow]);
        assert_eq!(gate.current(), 3);
    }

    #[tokio::test]
    async fn test_gate_waits_for_every_cursor() {
        let a = Arc::new(Cursor::new());
        let b = Arc::new(Cursor::new());
        let gate = DependencyGate::new(vec![Arc::clone(&a), Arc::clone(&b)]);

        let released = Arc::new(AtomicBool::new(false));
        let released_clone = Arc::clone(&released);
        let waiter = tokio::spawn(async move {
            let observed = gate.wait_past(-1, None, "test").await;
            released_clone.store(true, Ordering::SeqCst);
            observed
        });

        tokio::task::yield_now().await;
        a.advance(0);
        tokio::task::yield_now().await;
        // One of two dependencies is not enough; the minimum is still -1.
        assert!(!released.load(Ordering::SeqCst));

        b.advance(0);
        let observed = waiter.await.unwrap();
        assert!(released.load(Ordering::SeqCst));
        assert_eq!(observed, 0);
    }

    #[tokio::test]
    async fn test_gate_liveness_timeout_resumes_waiting() {
        let cursor = Arc::new(Cursor::new());
        let gate = DependencyGate::new(vec![Arc::clone(&cursor)]);

        let released = Arc::new(AtomicBool::new(false));
        let released_clone = Arc::clone(&released);
        let waiter = tokio::spawn(async move {
            let observed = gate
                .wait_past(-1, Some(Duration::from_millis(10)), "test")
                .await;
            released_clone.store(true, Ordering::SeqCst);
            observed
        });

        // Several liveness periods elapse without progress; the wait
        // must survive them.
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(!released.load(Ordering::SeqCst));

        cursor.advance(0);
        assert_eq!(waiter.await.unwrap(), 0);
        assert!(released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_gate_returns_immediately_when_already_past() {
        let cursor = Arc::new(Cursor::new());
        cursor.advance(5);
        let gate = DependencyGate::new(vec![cursor]);
        assert_eq!(gate.wait_past(2, None, "test").await, 5);
    }

    #[test]
    fn test_coordinator_cells_follow_registration_order() {
        let graph = resolved(vec![
            GroupSpec::new("zeta").handler("h"),
            GroupSpec::new("alpha").handler("h"),
            GroupSpec::new("mid").handler("h").wait_for("zeta"),
        ]);
        let coordinator = CursorCoordinator::new(&graph);

        let names: Vec<_> = coordinator
            .cells
            .iter()
            .map(|cell| cell.name().to_string())
            .collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_gate_for_follows_dependency_cursors() {
        let graph = resolved(vec![
            GroupSpec::new("parse").handler("h"),
            GroupSpec::new("index").handler("h").wait_for("parse"),
        ]);
        let coordinator = CursorCoordinator::new(&graph);

        // Root group gates on the source cursor.
        let parse_gate = coordinator.gate_for(&graph, "parse").unwrap();
        assert_eq!(parse_gate.current(), -1);
        coordinator.source().advance(4);
        assert_eq!(parse_gate.current(), 4);

        // Downstream group gates on its dependency's cursor, not the
        // source.
        let index_gate = coordinator.gate_for(&graph, "index").unwrap();
        assert_eq!(index_gate.current(), -1);
        coordinator.cell("parse").unwrap().cursor().advance(2);
        assert_eq!(index_gate.current(), 2);

        assert!(coordinator.gate_for(&graph, "missing").is_none());
    }

    #[test]
    fn test_floor_gate_tracks_slowest_group() {
        let graph = resolved(vec![
            GroupSpec::new("a").handler("h"),
            GroupSpec::new("b").handler("h"),
        ]);
        let coordinator = CursorCoordinator::new(&graph);
        let floor = coordinator.floor_gate();

        coordinator.cell("a").unwrap().cursor().advance(9);
        assert_eq!(floor.current(), -1);
        coordinator.cell("b").unwrap().cursor().advance(6);
        assert_eq!(floor.current(), 6);
    }

    #[test]
    fn test_status_for_unknown_group_is_none() {
        let graph = resolved(vec![GroupSpec::new("only").handler("h")]);
        let coordinator = CursorCoordinator::new(&graph);
        assert!(coordinator.status("nope").is_none());
        assert_eq!(coordinator.status("only").unwrap().state, GroupState::Idle);
    }
}
