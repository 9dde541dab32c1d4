//! Per-group consumer workers.
//!
//! One task per handler group. The loop waits on the group's dependency
//! gate, drains every newly available sequence through the group's
//! handlers in declared order, and advances the group cursor after each
//! fully processed sequence. A handler error faults the group and ends
//! the task; cancellation is honored at every suspension point and at
//! each sequence boundary inside a batch.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

use super::coordinator::{DependencyGate, Fault, GroupCell, GroupState};
use crate::core::{Event, Handler};
use crate::store::EventStore;

/// Handler chain of one group: registered name plus shared instance,
/// in declared order.
pub(crate) type HandlerChain<E> = Arc<[(String, Arc<dyn Handler<E>>)]>;

/// Consumer task state for one handler group.
pub(crate) struct GroupWorker<E: Event, S: EventStore<E>> {
    pub(crate) instance: Uuid,
    pub(crate) cell: Arc<GroupCell>,
    pub(crate) gate: DependencyGate,
    pub(crate) handlers: HandlerChain<E>,
    pub(crate) store: Arc<S>,
    pub(crate) liveness_timeout: Option<Duration>,
    pub(crate) token: CancellationToken,
}

impl<E: Event, S: EventStore<E>> GroupWorker<E, S> {
    /// Spawns the worker task and returns its handle.
    pub(crate) fn spawn(self) -> WorkerHandle {
        let group = self.cell.name().to_string();
        let cancellation_token = self.token.clone();
        info!("Starting worker for group '{}' ({})", group, self.instance);
        let handle = tokio::spawn(self.run());
        WorkerHandle {
            group,
            handle,
            cancellation_token,
        }
    }

    async fn run(self) {
        let group = self.cell.name().to_string();
        self.cell.set_state(GroupState::Running);
        // Picks up where the cursor left off, so a restarted group
        // re-attempts the sequence it faulted on.
        let mut completed = self.cell.cursor().get();
        loop {
            tokio::select! {
                biased;

                _ = self.token.cancelled() => {
                    break;
                }

                available = self.gate.wait_past(completed, self.liveness_timeout, self.cell.name()) => {
                    match self.drain(completed + 1, available).await {
                        Ok(done) => completed = done,
                        Err(fault) => {
                            error!("Group worker halting: {}", fault);
                            self.cell.record_fault(fault);
                            return;
                        }
                    }
                }
            }
        }
        self.cell.set_state(GroupState::Stopped);
        info!("Worker for group '{}' stopped at cursor {}", group, completed);
    }

    /// Runs every sequence in `from..=to` through the handler chain,
    /// advancing the cursor after each completed sequence. Returns the
    /// last completed sequence, which trails `to` when cancellation
    /// interrupts the batch.
    async fn drain(&self, from: i64, to: i64) -> Result<i64, Fault> {
        let mut completed = from - 1;
        for sequence in from..=to {
            if self.token.is_cancelled() {
                break;
            }
            let event = self.store.read(sequence);
            let end_of_batch = sequence == to;
            for (name, handler) in self.handlers.iter() {
                if let Err(source) = handler.process(&event, sequence, end_of_batch).await {
                    return Err(Fault {
                        group: self.cell.name().to_string(),
                        handler: name.clone(),
                        sequence,
                        message: source.to_string(),
                    });
                }
            }
            self.cell.cursor().advance(sequence);
            completed = sequence;
        }
        Ok(completed)
    }
}

/// Handle for controlling one group's worker task.
pub(crate) struct WorkerHandle {
    group: String,
    handle: JoinHandle<()>,
    cancellation_token: CancellationToken,
}

impl WorkerHandle {
    /// Name of the group this worker consumes for.
    pub(crate) fn group(&self) -> &str {
        &self.group
    }

    /// Cancels the worker and waits for the task to finish.
    pub(crate) async fn shutdown(self) {
        self.cancellation_token.cancel();
        let _ = self.handle.await;
    }
}
