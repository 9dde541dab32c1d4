//! Workflow assembly and the running-workflow handle.
//!
//! [`build_workflow`] turns a declarative [`WorkflowSpec`] plus a
//! [`HandlerRegistry`] into a live pipeline: it validates the spec,
//! resolves the dependency graph, wires cursors and gates, and spawns
//! one worker per group. The returned [`RunningWorkflow`] is the only
//! handle the caller needs afterwards: publish, status, restart,
//! shutdown.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use super::coordinator::{CursorCoordinator, GroupState, GroupStatus};
use super::error::{RuntimeError, RuntimeResult};
use super::publisher::{Publisher, PublisherGate};
use super::worker::{GroupWorker, HandlerChain, WorkerHandle};
use crate::core::{Event, HandlerRegistry, PipelineConfig, WorkflowSpec};
use crate::graph::{BuildError, BuildResult, GroupRegistry, WorkflowGraph};
use crate::store::{EventStore, InMemoryEventStore};

/// Builds and starts a workflow over an in-memory ring store sized by
/// the spec's capacity.
///
/// Problems are reported in spec order: capacity first, then per-group
/// registration checks, then graph resolution, then handler lookup.
/// Nothing is spawned until the whole spec has been validated.
pub async fn build_workflow<E: Event>(
    spec: WorkflowSpec,
    handlers: HandlerRegistry<E>,
) -> BuildResult<RunningWorkflow<E>> {
    let config = *spec.pipeline_config();
    if !config.capacity_is_valid() {
        return Err(BuildError::invalid_capacity(config.capacity));
    }
    let store = Arc::new(InMemoryEventStore::new(config.capacity));
    RunningWorkflow::start(spec, handlers, store).await
}

/// Same as [`build_workflow`], over a caller-provided store.
///
/// The store's own capacity governs backpressure; the spec's capacity
/// setting is ignored.
pub async fn build_workflow_with_store<E: Event, S: EventStore<E>>(
    spec: WorkflowSpec,
    handlers: HandlerRegistry<E>,
    store: Arc<S>,
) -> BuildResult<RunningWorkflow<E, S>> {
    RunningWorkflow::start(spec, handlers, store).await
}

/// A live pipeline: one worker task per handler group, a serialized
/// publish path, and per-group status introspection.
///
/// Dropping the handle cancels the workers without joining them;
/// prefer [`RunningWorkflow::shutdown`] for deterministic teardown.
pub struct RunningWorkflow<E: Event, S: EventStore<E> = InMemoryEventStore<E>> {
    instance: Uuid,
    graph: WorkflowGraph,
    coordinator: CursorCoordinator,
    store: Arc<S>,
    publisher: Publisher<E, S>,
    gate: PublisherGate,
    chains: HashMap<String, HandlerChain<E>>,
    config: PipelineConfig,
    token: CancellationToken,
    workers: Mutex<HashMap<String, WorkerHandle>>,
}

impl<E: Event, S: EventStore<E>> RunningWorkflow<E, S> {
    async fn start(
        spec: WorkflowSpec,
        handlers: HandlerRegistry<E>,
        store: Arc<S>,
    ) -> BuildResult<Self> {
        let instance = Uuid::new_v4();
        let config = *spec.pipeline_config();

        let mut registry = GroupRegistry::new();
        for group in spec.groups() {
            registry.register(group.clone())?;
        }
        let groups = registry.finalize()?;
        let graph = WorkflowGraph::resolve(&groups)?;

        // Resolve every handler name up front so a bad spec cannot
        // leave half a workflow running.
        let mut chains: HashMap<String, HandlerChain<E>> = HashMap::with_capacity(groups.len());
        for group in groups.iter() {
            let mut chain = Vec::with_capacity(group.handler_names().len());
            for handler_name in group.handler_names() {
                let handler = handlers
                    .get(handler_name)
                    .ok_or_else(|| BuildError::unknown_handler(group.name(), handler_name))?;
                chain.push((handler_name.clone(), handler));
            }
            chains.insert(group.name().to_string(), Arc::from(chain));
        }

        let coordinator = CursorCoordinator::new(&graph);
        let token = CancellationToken::new();
        let gate = PublisherGate::new(spec.publisher_endpoints().iter().cloned());
        let publisher = Publisher::new(
            Arc::clone(&store),
            Arc::clone(coordinator.source()),
            coordinator.floor_gate(),
            config.liveness_timeout,
            token.clone(),
        );

        let workflow = Self {
            instance,
            graph,
            coordinator,
            store,
            publisher,
            gate,
            chains,
            config,
            token,
            workers: Mutex::new(HashMap::new()),
        };

        {
            let mut workers = workflow
                .workers
                .lock()
                .expect("worker table Mutex poisoned - unrecoverable state");
            let names: Vec<String> = workflow.graph.group_names().map(str::to_string).collect();
            for name in names {
                if let Some(handle) = workflow.spawn_worker(&name) {
                    workers.insert(name, handle);
                }
            }
        }

        info!(
            "Workflow {} started: {} groups in {} stages, capacity {}",
            instance,
            workflow.graph.group_count(),
            workflow.graph.stages().len(),
            workflow.store.capacity()
        );
        Ok(workflow)
    }

    /// Builds and spawns the worker for one group. Returns `None` for
    /// names the graph does not know.
    fn spawn_worker(&self, group: &str) -> Option<WorkerHandle> {
        let cell = Arc::clone(self.coordinator.cell(group)?);
        let gate = self.coordinator.gate_for(&self.graph, group)?;
        let handlers = Arc::clone(self.chains.get(group)?);
        Some(
            GroupWorker {
                instance: self.instance,
                cell,
                gate,
                handlers,
                store: Arc::clone(&self.store),
                liveness_timeout: self.config.liveness_timeout,
                token: self.token.child_token(),
            }
            .spawn(),
        )
    }

    /// Admits one event from `endpoint` and returns its assigned
    /// sequence.
    ///
    /// Suspends while the ring is full. Fails with
    /// [`RuntimeError::UnauthorizedPublisher`] for endpoints the spec
    /// never permitted and with [`RuntimeError::Stopped`] once shutdown
    /// has begun; an unauthorized publish affects nothing else.
    pub async fn publish(&self, endpoint: &str, event: E) -> RuntimeResult<i64> {
        self.gate.authorize(endpoint)?;
        let sequence = self.publisher.publish(event).await?;
        debug!("Published sequence {} from endpoint '{}'", sequence, endpoint);
        Ok(sequence)
    }

    /// Point-in-time status of one group, `None` for unknown names.
    pub fn status(&self, group: &str) -> Option<GroupStatus> {
        self.coordinator.status(group)
    }

    /// Status of every group, in registration order.
    pub fn statuses(&self) -> Vec<GroupStatus> {
        self.coordinator.statuses()
    }

    /// Restarts a faulted group.
    ///
    /// The captured fault is cleared and a fresh worker resumes from
    /// the group's retained cursor, re-attempting the sequence that
    /// failed. Rejects unknown names and groups that are not faulted.
    pub async fn restart(&self, group: &str) -> RuntimeResult<()> {
        if self.token.is_cancelled() {
            return Err(RuntimeError::Stopped);
        }
        let cell = self
            .coordinator
            .cell(group)
            .ok_or_else(|| RuntimeError::unknown_group(group))?;
        let state = cell.state();
        if state != GroupState::Faulted {
            return Err(RuntimeError::not_faulted(group, state));
        }

        // The faulted worker task has already returned; joining it here
        // only reaps the handle.
        let previous = {
            let mut workers = self
                .workers
                .lock()
                .expect("worker table Mutex poisoned - unrecoverable state");
            workers.remove(group)
        };
        if let Some(handle) = previous {
            handle.shutdown().await;
        }

        cell.clear_fault();
        info!(
            "Restarting group '{}' from cursor {}",
            group,
            cell.cursor().get()
        );
        let handle = self
            .spawn_worker(group)
            .expect("faulted group lost its worker definition - unrecoverable state");
        self.workers
            .lock()
            .expect("worker table Mutex poisoned - unrecoverable state")
            .insert(group.to_string(), handle);
        Ok(())
    }

    /// Stops the workflow cooperatively: cancels every worker, waits
    /// for each to finish the sequence it is on, and rejects publishes
    /// from this point on. Safe to call more than once.
    pub async fn shutdown(&self) {
        info!("Shutting down workflow {}", self.instance);
        self.token.cancel();
        let drained: Vec<WorkerHandle> = {
            let mut workers = self
                .workers
                .lock()
                .expect("worker table Mutex poisoned - unrecoverable state");
            workers.drain().map(|(_, handle)| handle).collect()
        };
        for handle in drained {
            let group = handle.group().to_string();
            handle.shutdown().await;
            debug!("Worker for group '{}' joined", group);
        }
        info!("Workflow {} stopped", self.instance);
    }

    /// Unique id of this workflow instance, present in its log lines.
    pub fn instance_id(&self) -> Uuid {
        self.instance
    }

    /// The resolved dependency graph the workflow runs on.
    pub fn graph(&self) -> &WorkflowGraph {
        &self.graph
    }

    /// The endpoint allowlist in effect.
    pub fn publisher_gate(&self) -> &PublisherGate {
        &self.gate
    }

    /// The configuration the workflow was built with.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The underlying event store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}

impl<E: Event, S: EventStore<E>> fmt::Debug for RunningWorkflow<E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunningWorkflow")
            .field("instance", &self.instance)
            .field("groups", &self.graph.group_count())
            .finish()
    }
}

impl<E: Event, S: EventStore<E>> Drop for RunningWorkflow<E, S> {
    fn drop(&mut self) {
        // Workers stop on their own once the token flips; without this,
        // dropping the last handle would leave them parked forever.
        self.token.cancel();
    }
}
