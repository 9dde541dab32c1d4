//! Group registry and dependency-graph resolution.
//!
//! This module turns declared handler groups into a validated execution
//! plan:
//!
//! - [`GroupRegistry`]: shape validation at registration, frozen into a
//!   [`GroupSet`]
//! - [`WorkflowGraph`]: token resolution, cycle detection, reachability,
//!   depth assignment, [`Stage`] ordering
//! - [`BuildError`]: every build-time failure with self-sufficient
//!   diagnostics
//!
//! Following Parnas's information hiding principles, the graph
//! representation (interned ids, adjacency vectors) stays private; callers
//! see names, stages, and errors.

mod error;
mod group_id;
mod registry;
mod workflow_graph;

pub use error::{BuildError, BuildResult};
pub use group_id::GroupId;
pub use registry::{GroupRegistry, GroupSet};
pub use workflow_graph::{Stage, WorkflowGraph};
