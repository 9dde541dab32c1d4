//! Handler capability interface and the name-based handler registry.
//!
//! Following Dave Cheney's principle "The name of an identifier includes its
//! package name," we use `Handler` and `HandlerRegistry` rather than
//! `EventHandler` and `EventHandlerRegistry` since the `sequent::` namespace
//! already indicates these are event-related.
//!
//! Every handler variant, however heterogeneous, is reached through the one
//! [`Handler`] trait; there is no runtime type inspection anywhere in the
//! pipeline. Groups declare handlers by *name*; the names are resolved
//! against a [`HandlerRegistry`] when the workflow is built, the same way a
//! declarative loader resolves component references.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Type Aliases
// ============================================================================

/// A boxed error that can be sent across threads.
///
/// This is the standard error type used throughout async Rust ecosystems
/// (tokio, tower, axum, etc.). Any error implementing `std::error::Error`
/// can be automatically converted to this type.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// ============================================================================
// Event Marker
// ============================================================================

/// Marker trait for event payloads flowing through the pipeline.
///
/// Blanket-implemented for every type that is cloneable and thread-safe, so
/// plain structs and enums qualify without any manual impl. Events are cloned
/// out of the shared store once per group and sequence; keep payloads cheap
/// to clone (or wrap large ones in `Arc`).
pub trait Event: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Event for T {}

// ============================================================================
// Handler Trait
// ============================================================================

/// The single capability interface implemented by every event handler.
///
/// A group's worker invokes its handlers in declared order for each sequence,
/// so a handler never sees sequence `n + 1` before every handler in the same
/// group has finished sequence `n`.
///
/// # Arguments
///
/// - `event`: the published payload at `sequence`
/// - `sequence`: the zero-based position of the event in the store
/// - `end_of_batch`: true when this is the last sequence of the batch the
///   worker drained in one gate pass; flush-style handlers can use it to
///   coalesce side effects
///
/// # Errors
///
/// Returning an error faults the handler's whole group: the worker stops, the
/// group's cursor freezes at the last fully processed sequence, and
/// downstream groups stall there until the group is restarted.
///
/// # Example
///
/// ```
/// use sequent::core::{BoxError, Handler};
/// use async_trait::async_trait;
///
/// struct Journal;
///
/// #[async_trait]
/// impl Handler<String> for Journal {
///     async fn process(&self, event: &String, sequence: i64, _end_of_batch: bool) -> Result<(), BoxError> {
///         println!("seq {sequence}: {event}");
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Handler<E: Event>: Send + Sync {
    /// Processes one event at the given sequence.
    async fn process(&self, event: &E, sequence: i64, end_of_batch: bool) -> Result<(), BoxError>;
}

/// Adapter that lets a plain closure act as a [`Handler`].
///
/// Useful in tests and small pipelines where a full trait impl is noise.
struct FnHandler<F> {
    f: F,
}

#[async_trait]
impl<E, F> Handler<E> for FnHandler<F>
where
    E: Event,
    F: Fn(&E, i64) -> Result<(), BoxError> + Send + Sync,
{
    async fn process(&self, event: &E, sequence: i64, _end_of_batch: bool) -> Result<(), BoxError> {
        (self.f)(event, sequence)
    }
}

// ============================================================================
// Handler Registry
// ============================================================================

/// Maps handler names to handler instances.
///
/// Group specs carry handler *names*; `build_workflow` resolves each name
/// here and fails with `BuildError::UnknownHandler` on a miss, so a typo is a
/// build-time diagnostic rather than a runtime surprise. Registering a name
/// twice replaces the earlier instance.
pub struct HandlerRegistry<E: Event> {
    handlers: HashMap<String, Arc<dyn Handler<E>>>,
}

impl<E: Event> HandlerRegistry<E> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registers a handler under the given name.
    pub fn register(&mut self, name: impl Into<String>, handler: impl Handler<E> + 'static) {
        self.handlers.insert(name.into(), Arc::new(handler));
    }

    /// Registers an already shared handler under the given name.
    ///
    /// Use this when the same instance backs several names or is also held
    /// elsewhere (e.g. for out-of-band inspection in tests).
    pub fn register_arc(&mut self, name: impl Into<String>, handler: Arc<dyn Handler<E>>) {
        self.handlers.insert(name.into(), handler);
    }

    /// Registers a synchronous closure as a handler.
    ///
    /// The closure receives the event and its sequence; the batch flag is
    /// dropped, which suits side-effect-per-event handlers.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&E, i64) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.handlers.insert(name.into(), Arc::new(FnHandler { f }));
    }

    /// Looks up a handler by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Handler<E>>> {
        self.handlers.get(name).cloned()
    }

    /// Returns true if a handler is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns true if no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<E: Event> Default for HandlerRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> fmt::Debug for HandlerRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("HandlerRegistry")
            .field("handlers", &names)
            .finish()
    }
}
