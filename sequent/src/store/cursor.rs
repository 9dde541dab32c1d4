//! Per-group sequence cursor.
//!
//! The cursor is the only datum shared across workers at runtime: a group's
//! worker advances its own cursor after fully processing a sequence (single
//! writer), and any number of dependent workers read it through their gate
//! (multi reader). Advancement is a `fetch_max` with release semantics and
//! reads are acquire loads, so a dependent that observes an advance also
//! observes every slot write and side effect that preceded it. Weakening
//! this pairing breaks the pipeline's one correctness rule.
//!
//! Each advance wakes registered waiters through a [`Notify`]; waiters must
//! register interest *before* re-checking the value (see [`Cursor::wait_past`])
//! or a wakeup between check and park is lost.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::futures::Notified;
use tokio::sync::Notify;

/// Pads a value to a cache line so neighboring cursors never false-share.
///
/// 64 bytes covers x86_64 and mainstream aarch64 line sizes.
#[repr(C, align(64))]
pub(crate) struct CachePadded<T> {
    value: T,
}

impl<T> CachePadded<T> {
    pub(crate) const fn new(value: T) -> Self {
        Self { value }
    }

    pub(crate) fn get(&self) -> &T {
        &self.value
    }
}

/// A monotonically non-decreasing sequence number with waiter wakeup.
///
/// Starts at [`Cursor::INITIAL`] (-1, "before the first event"). The value
/// only ever grows: [`advance`](Cursor::advance) is a `fetch_max`, so a
/// stale or reordered call can never pull the cursor backwards, under any
/// interleaving.
pub struct Cursor {
    sequence: CachePadded<AtomicI64>,
    advanced: Notify,
}

impl Cursor {
    /// The value before any event has been processed.
    pub const INITIAL: i64 = -1;

    /// Creates a cursor at [`Cursor::INITIAL`].
    pub fn new() -> Self {
        Self {
            sequence: CachePadded::new(AtomicI64::new(Self::INITIAL)),
            advanced: Notify::new(),
        }
    }

    /// Current value (acquire load).
    pub fn get(&self) -> i64 {
        self.sequence.get().load(Ordering::Acquire)
    }

    /// Advances the cursor to at least `to` and wakes waiters.
    ///
    /// Returns the resulting value. Calls with `to` at or below the current
    /// value are no-ops apart from the wakeup; the cursor never decreases.
    pub fn advance(&self, to: i64) -> i64 {
        let prev = self.sequence.get().fetch_max(to, Ordering::AcqRel);
        self.advanced.notify_waiters();
        prev.max(to)
    }

    /// A future completing on the next advance.
    ///
    /// Callers composing waits across several cursors must pin and
    /// [`enable`](Notified::enable) each future before re-checking values,
    /// then re-check; see [`Cursor::wait_past`] for the single-cursor shape.
    pub fn notified(&self) -> Notified<'_> {
        self.advanced.notified()
    }

    /// Waits until the cursor exceeds `seq`, returning the observed value.
    ///
    /// The return value may be well past `seq + 1` when the writer ran
    /// ahead; callers drain the whole range. Cancellation-safe: dropping the
    /// future leaves the cursor untouched.
    pub async fn wait_past(&self, seq: i64) -> i64 {
        loop {
            let notified = self.advanced.notified();
            tokio::pin!(notified);
            // Register before checking, so an advance landing between the
            // check and the await still wakes us.
            notified.as_mut().enable();
            let current = self.get();
            if current > seq {
                return current;
            }
            notified.await;
        }
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cursor({})", self.get())
    }
}
