//! Declarative workflow description.
//!
//! These are the plain value types a configuration loader hands over: which
//! handler groups exist, what each waits for, and which endpoints may
//! publish. They carry no behavior beyond construction convenience. All
//! validation happens when the workflow is built, so a spec deserialized from
//! hostile input is merely rejected there, never a panic here.

use crate::core::PipelineConfig;
use serde::{Deserialize, Serialize};

/// Sentinel dependency token meaning "the raw event store."
///
/// A group whose only dependency is `SOURCE` gates directly on the publish
/// cursor and therefore sees events as soon as they are admitted. Groups
/// that declare no dependencies at all are treated as if they declared
/// exactly this token.
pub const SOURCE: &str = "SOURCE";

// ============================================================================
// Group Spec
// ============================================================================

/// Description of one handler group: its name, its handlers (by registered
/// name, in invocation order), and the dependency tokens it waits for.
///
/// # Examples
///
/// ```
/// use sequent::core::GroupSpec;
///
/// // Gates on the raw event store (the default when nothing is declared).
/// let journal = GroupSpec::new("journal").handler("write_journal");
///
/// // Gates on both upstream groups; handlers run in declared order.
/// let publish = GroupSpec::new("publish")
///     .handler("render")
///     .handler("send")
///     .wait_for("journal")
///     .wait_for("enrich");
/// assert_eq!(publish.dependencies(), ["journal", "enrich"]);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSpec {
    name: String,
    handlers: Vec<String>,
    #[serde(default)]
    depends_on: Vec<String>,
}

impl GroupSpec {
    /// Creates a group spec with no handlers and no dependencies.
    ///
    /// At least one handler must be added before the spec is registered;
    /// leaving `depends_on` empty means the group waits on [`SOURCE`].
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handlers: Vec::new(),
            depends_on: Vec::new(),
        }
    }

    /// Appends one handler name to the invocation order.
    pub fn handler(mut self, name: impl Into<String>) -> Self {
        self.handlers.push(name.into());
        self
    }

    /// Appends several handler names, preserving iteration order.
    pub fn handlers<I, T>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.handlers.extend(names.into_iter().map(Into::into));
        self
    }

    /// Adds a dependency token: another group's name, or [`SOURCE`].
    ///
    /// Duplicate tokens are harmless; the resolver collapses them to a
    /// single edge.
    pub fn wait_for(mut self, token: impl Into<String>) -> Self {
        self.depends_on.push(token.into());
        self
    }

    /// The group name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handler names in declared invocation order.
    pub fn handler_names(&self) -> &[String] {
        &self.handlers
    }

    /// Declared dependency tokens, duplicates and all.
    pub fn dependencies(&self) -> &[String] {
        &self.depends_on
    }
}

// ============================================================================
// Workflow Spec
// ============================================================================

/// The complete declarative input to `build_workflow`: groups, permitted
/// publisher endpoints, and pipeline configuration.
///
/// # Examples
///
/// ```
/// use sequent::core::{GroupSpec, WorkflowSpec};
///
/// let spec = WorkflowSpec::new()
///     .group(GroupSpec::new("journal").handler("write_journal"))
///     .group(GroupSpec::new("audit").handler("audit_trail").wait_for("journal"))
///     .publisher("orders-in");
/// assert_eq!(spec.groups().len(), 2);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSpec {
    groups: Vec<GroupSpec>,
    #[serde(default)]
    publisher_endpoints: Vec<String>,
    #[serde(default)]
    config: PipelineConfig,
}

impl WorkflowSpec {
    /// Creates an empty spec with default configuration.
    pub fn new() -> Self {
        Self {
            groups: Vec::new(),
            publisher_endpoints: Vec::new(),
            config: PipelineConfig::default(),
        }
    }

    /// Adds a handler group. Order matters only for diagnostics and stage
    /// iteration determinism, never for scheduling.
    pub fn group(mut self, group: GroupSpec) -> Self {
        self.groups.push(group);
        self
    }

    /// Permits one endpoint to publish into the workflow.
    pub fn publisher(mut self, endpoint: impl Into<String>) -> Self {
        self.publisher_endpoints.push(endpoint.into());
        self
    }

    /// Permits several endpoints at once.
    pub fn publishers<I, T>(mut self, endpoints: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.publisher_endpoints
            .extend(endpoints.into_iter().map(Into::into));
        self
    }

    /// Replaces the pipeline configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Shortcut for setting only the store capacity.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.config.capacity = capacity;
        self
    }

    /// The declared groups, in declaration order.
    pub fn groups(&self) -> &[GroupSpec] {
        &self.groups
    }

    /// Endpoints permitted to publish.
    pub fn publisher_endpoints(&self) -> &[String] {
        &self.publisher_endpoints
    }

    /// The pipeline configuration.
    pub fn pipeline_config(&self) -> &PipelineConfig {
        &self.config
    }
}

impl Default for WorkflowSpec {
    fn default() -> Self {
        Self::new()
    }
}
