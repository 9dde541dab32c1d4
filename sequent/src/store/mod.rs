//! Event storage for the sequent pipeline.
//!
//! This module provides the storage primitive the rest of the crate
//! coordinates around:
//!
//! - [`EventStore`]: the slot-store capability every backend implements
//! - [`InMemoryEventStore`]: the default fixed-capacity ring
//! - [`Cursor`]: the shared sequence counter groups advance and gate on
//!
//! The split of responsibilities is deliberate: the store holds bytes and a
//! publish watermark, nothing else. Who may append when (serialization,
//! backpressure) and who may read what (gating) are enforced by the pipeline
//! layer, which is where those rules are testable against the dependency
//! graph.

use crate::core::Event;

pub(crate) mod cursor;
mod memory;

pub use cursor::Cursor;
pub use memory::InMemoryEventStore;

/// A bounded, append-only slot store for events.
///
/// Implementations hold `capacity()` slots and reuse the slot for sequence
/// `n` when sequence `n + capacity()` is appended. The trait is intentionally
/// synchronous and lock-free on the read side; all waiting happens in the
/// pipeline layer against cursors, never inside the store.
///
/// # Contracts
///
/// Callers uphold two rules the implementations rely on:
///
/// - **Dense, serialized appends**: `append` is called with exactly
///   `published() + 1`, by one caller at a time. The workflow's publish path
///   owns this; appending out of order or concurrently is a logic error.
/// - **Windowed access**: `append` is only called once every group's cursor
///   is within `capacity()` of the new sequence, and `read` only targets
///   sequences in `(published() - capacity(), published()]` that the
///   caller's gate has admitted.
pub trait EventStore<E: Event>: Send + Sync + 'static {
    /// Number of slots.
    fn capacity(&self) -> usize;

    /// Highest published sequence, -1 when nothing was appended yet.
    ///
    /// An acquire load: a reader that observes sequence `n` here also
    /// observes the slot write for every sequence up to `n`.
    fn published(&self) -> i64;

    /// Writes the event for `sequence` and publishes it.
    fn append(&self, sequence: i64, event: E);

    /// Clones out the event at `sequence`.
    fn read(&self, sequence: i64) -> E;
}
