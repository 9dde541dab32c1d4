//! Sequent: Declarative Event Pipelines over a Shared Ring
//!
//! `sequent` (from Latin *sequens*, "following in order") runs declaratively
//! configured handler groups over a single stream of events. One writer
//! appends to a fixed-capacity ring store; every group follows the stream at
//! its own pace, gated on the groups it depends on, coordinated through
//! atomic cursors instead of locks or queues.
//!
//! # Features
//!
//! - **Declarative wiring**: groups, handler order and dependencies are plain
//!   data, loadable from configuration
//! - **Single-writer ring**: one serialized insert path over a pre-allocated
//!   store, no allocation per event
//! - **Cursor coordination**: consumers publish progress through atomic
//!   cursors; a group sees a sequence only after every upstream group
//!   finished it
//! - **Fault isolation**: a failing handler faults its own group and freezes
//!   its cursor; independent groups keep running
//! - **Backpressure**: the writer stalls when the slowest group is a full
//!   ring behind, never overwriting unread slots
//! - **Cooperative shutdown**: cancellation honored at every suspension point
//!
//! # Quick Start
//!
//! ```ignore
//! use sequent::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut handlers = HandlerRegistry::new();
//!     handlers.register_fn("write_journal", |event: &String, seq| {
//!         println!("journal[{seq}]: {event}");
//!         Ok(())
//!     });
//!     handlers.register_fn("audit_trail", |_event: &String, _seq| Ok(()));
//!
//!     let spec = WorkflowSpec::new()
//!         .group(GroupSpec::new("journal").handler("write_journal"))
//!         .group(
//!             GroupSpec::new("audit")
//!                 .handler("audit_trail")
//!                 .wait_for("journal"),
//!         )
//!         .publisher("orders-in");
//!
//!     let workflow = build_workflow(spec, handlers).await?;
//!     workflow.publish("orders-in", "order-1001".to_string()).await?;
//!     workflow.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Module Organization
//!
//! Following Parnas's information hiding principles, each module hides
//! specific design decisions that are likely to change:
//!
//! - [`core`]: Spec types, handler trait and registry (hides dispatch
//!   plumbing)
//! - [`graph`]: Group registry and dependency resolution (hides the graph
//!   representation)
//! - [`store`]: Ring storage and cursors (hides slot layout and memory
//!   ordering)
//! - [`pipeline`]: Assembly and runtime (hides all coordination machinery)
//!
//! # Design Principles
//!
//! This library follows Dave Cheney's practical programming wisdom:
//! - **Simplicity**: Simple, focused APIs that do one thing well
//! - **Clarity**: Explicit over implicit, readable over clever
//! - **Safety**: Hard to misuse, defaults prevent common mistakes

pub mod core;
pub mod graph;
pub mod pipeline;
pub mod store;

// Re-export commonly used types for convenience
pub use core::{
    BoxError, Event, GroupSpec, Handler, HandlerRegistry, PipelineConfig, WorkflowSpec,
    DEFAULT_CAPACITY, MAX_CAPACITY, MIN_CAPACITY, SOURCE,
};

pub use graph::{BuildError, BuildResult, GroupId, GroupRegistry, GroupSet, Stage, WorkflowGraph};

pub use pipeline::{
    build_workflow, build_workflow_with_store, Fault, GroupState, GroupStatus, PublisherGate,
    RunningWorkflow, RuntimeError, RuntimeResult,
};

pub use store::{Cursor, EventStore, InMemoryEventStore};

// Re-export dependencies used in public API
// This ensures users don't have version mismatch errors (Effective Rust Item 24)
pub use async_trait::async_trait; // Users implement Handler with #[async_trait]
pub use serde; // Users deserialize WorkflowSpec from their own config files
pub use tokio; // Users need a tokio runtime and #[tokio::main]
pub use uuid; // Workflow instance ids are Uuids

/// Prelude module for convenient glob imports
///
/// # Example
///
/// ```ignore
/// use sequent::prelude::*;
/// ```
pub mod prelude {
    pub use crate::core::{
        BoxError, Event, GroupSpec, Handler, HandlerRegistry, PipelineConfig, WorkflowSpec, SOURCE,
    };

    pub use crate::graph::{BuildError, BuildResult, WorkflowGraph};

    pub use crate::pipeline::{
        build_workflow, build_workflow_with_store, Fault, GroupState, GroupStatus,
        RunningWorkflow, RuntimeError, RuntimeResult,
    };

    pub use crate::store::{EventStore, InMemoryEventStore};

    pub use async_trait::async_trait;

    // Re-export commonly used external types
    pub use serde::{Deserialize, Serialize};
    pub use std::sync::Arc;
    pub use uuid::Uuid;
}
