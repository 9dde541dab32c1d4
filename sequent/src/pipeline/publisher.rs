//! Publish-side admission and the serialized insert path.
//!
//! [`PublisherGate`] is the build-time allowlist of endpoints; it never
//! changes while the workflow runs. [`Publisher`] owns the single
//! point where new events enter the ring: one claim at a time, bounded
//! by the backpressure floor, appended to the store and announced on
//! the source cursor.

use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use super::coordinator::DependencyGate;
use super::error::{RuntimeError, RuntimeResult};
use crate::core::Event;
use crate::store::{Cursor, EventStore};

/// Set of endpoints permitted to publish into a workflow.
///
/// Membership is fixed at build time from the workflow spec. An empty
/// gate rejects every endpoint.
#[derive(Debug, Clone, Default)]
pub struct PublisherGate {
    endpoints: HashSet<String>,
}

impl PublisherGate {
    pub fn new<I, T>(endpoints: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            endpoints: endpoints.into_iter().map(Into::into).collect(),
        }
    }

    /// Adds an endpoint to the permitted set.
    pub fn permit(&mut self, endpoint: impl Into<String>) {
        self.endpoints.insert(endpoint.into());
    }

    pub fn is_permitted(&self, endpoint: &str) -> bool {
        self.endpoints.contains(endpoint)
    }

    /// Rejects unknown endpoints with
    /// [`RuntimeError::UnauthorizedPublisher`].
    pub fn authorize(&self, endpoint: &str) -> RuntimeResult<()> {
        if self.is_permitted(endpoint) {
            Ok(())
        } else {
            Err(RuntimeError::unauthorized(endpoint))
        }
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

/// The single insertion point of a running workflow.
///
/// All publishes funnel through one async lock, so sequence claims are
/// totally ordered and the store only ever sees dense, one-at-a-time
/// appends. Before writing sequence `n` the publisher waits until the
/// floor (minimum of all group cursors) has passed `n - capacity`,
/// which is the moment slot `n % capacity` is no longer readable by
/// any group.
pub(crate) struct Publisher<E: Event, S: EventStore<E>> {
    store: Arc<S>,
    source: Arc<Cursor>,
    floor: DependencyGate,
    insert_lock: Mutex<()>,
    capacity: i64,
    liveness_timeout: Option<Duration>,
    token: CancellationToken,
    _event: PhantomData<E>,
}

impl<E: Event, S: EventStore<E>> Publisher<E, S> {
    pub(crate) fn new(
        store: Arc<S>,
        source: Arc<Cursor>,
        floor: DependencyGate,
        liveness_timeout: Option<Duration>,
        token: CancellationToken,
    ) -> Self {
        let capacity = store.capacity() as i64;
        Self {
            store,
            source,
            floor,
            insert_lock: Mutex::new(()),
            capacity,
            liveness_timeout,
            token,
            _event: PhantomData,
        }
    }

    /// Claims the next sequence, waits out backpressure, writes the
    /// event and announces it. Returns the assigned sequence.
    ///
    /// Returns [`RuntimeError::Stopped`] when shutdown is requested
    /// before the claim or while waiting on the floor.
    pub(crate) async fn publish(&self, event: E) -> RuntimeResult<i64> {
        let _guard = self.insert_lock.lock().await;
        if self.token.is_cancelled() {
            return Err(RuntimeError::Stopped);
        }

        let next = self.source.get() + 1;
        // Writing `next` reuses the slot of `next - capacity`; the
        // floor must clear that sequence first.
        let reclaim = next - self.capacity;
        if self.floor.current() < reclaim {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => return Err(RuntimeError::Stopped),
                _ = self.floor.wait_past(reclaim - 1, self.liveness_timeout, "publisher") => {}
            }
        }

        self.store.append(next, event);
        self.source.advance(next);
        Ok(next)
    }
}
