//! Pipeline assembly and runtime.
//!
//! This module turns a validated plan into a live system and is the only
//! place concurrency happens:
//!
//! - [`build_workflow`] / [`build_workflow_with_store`]: validate a spec
//!   and spawn one worker per group
//! - [`RunningWorkflow`]: the caller's handle for publish, status,
//!   restart, and shutdown
//! - [`PublisherGate`]: the endpoint allowlist fixed at build time
//! - [`GroupStatus`] / [`GroupState`] / [`Fault`]: per-group introspection
//! - [`RuntimeError`]: everything that can go wrong after startup
//!
//! Following Parnas's information hiding principles, the coordination
//! machinery (cursor cells, dependency gates, worker loops, the
//! serialized insert path) stays private; callers see group names,
//! sequences, and statuses.

mod coordinator;
mod error;
mod publisher;
mod worker;
mod workflow;

pub use coordinator::{Fault, GroupState, GroupStatus};
pub use error::{RuntimeError, RuntimeResult};
pub use publisher::PublisherGate;
pub use workflow::{build_workflow, build_workflow_with_store, RunningWorkflow};
