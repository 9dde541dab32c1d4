//! Core types for the sequent pipeline.
//!
//! This module provides the foundation the rest of the crate builds on:
//!
//! # Domain Model
//! - [`GroupSpec`] / [`WorkflowSpec`]: the declarative description a
//!   configuration loader produces
//! - [`SOURCE`]: the sentinel dependency meaning "the raw event store"
//! - [`PipelineConfig`]: capacity and liveness tuning, fixed at build time
//!
//! # Handler Dispatch
//! - [`Handler`]: the single capability interface every handler implements
//! - [`HandlerRegistry`]: name-to-instance resolution at build time
//! - [`Event`]: blanket marker for payload types
//! - [`BoxError`]: what handlers return on failure
//!
//! Nothing in this module spawns tasks or touches atomics; it is pure data
//! and trait surface, shared by the graph resolver and the runtime.

mod config;
mod handler;
mod spec;

pub use config::{PipelineConfig, DEFAULT_CAPACITY, MAX_CAPACITY, MIN_CAPACITY};
pub use handler::{BoxError, Event, Handler, HandlerRegistry};
pub use spec::{GroupSpec, WorkflowSpec, SOURCE};
