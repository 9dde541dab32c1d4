//! Build-time error types.
//!
//! Every failure that can occur between "here is a spec" and "workers are
//! running" lives in one enum, so the single `build_workflow` entry point has
//! a single error surface. All of these are fatal to construction: the caller
//! fixes the configuration and rebuilds.

use thiserror::Error;

/// Result type for workflow construction.
pub type BuildResult<T> = Result<T, BuildError>;

/// Errors detected while validating, resolving, or assembling a workflow.
///
/// Diagnostics are self-sufficient: they carry the group name, the offending
/// token, or the full cycle path, so the message alone locates the
/// configuration mistake.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BuildError {
    /// Two groups were registered under the same name
    #[error("Duplicate group name: '{group}'")]
    DuplicateGroupName {
        /// The name registered twice
        group: String,
    },

    /// A group declared no handlers
    #[error("Group '{group}' declares no handlers - every group needs at least one")]
    EmptyHandlerList {
        /// The handler-less group
        group: String,
    },

    /// A group was registered with a blank name
    #[error("Group name is blank")]
    MissingGroupName,

    /// The registry was finalized with zero groups
    #[error("No groups defined - a workflow needs at least one handler group")]
    NoGroupsDefined,

    /// A dependency token matches no declared group
    #[error("Group '{group}' waits for unknown dependency '{token}'")]
    UnknownDependency {
        /// The group that declared the dependency
        group: String,
        /// The token that resolved to nothing
        token: String,
    },

    /// The dependency graph contains a cycle
    #[error("Dependency cycle: {}", path.join(" -> "))]
    DependencyCycle {
        /// The cycle as an ordered list of group names, closed on the first
        /// name (e.g. `["a", "b", "a"]`)
        path: Vec<String>,
    },

    /// A group is not reachable from the event source
    #[error("Group '{group}' is unreachable from the event source")]
    UnreachableGroup {
        /// The orphaned group
        group: String,
    },

    /// A group references a handler name absent from the registry
    #[error("Group '{group}' references unknown handler '{handler}'")]
    UnknownHandler {
        /// The group whose handler list failed to resolve
        group: String,
        /// The name with no registered handler
        handler: String,
    },

    /// The configured store capacity is unusable
    #[error("Invalid store capacity {requested}: must be a power of two in [{min}, {max}]")]
    InvalidCapacity {
        /// The capacity the config asked for
        requested: usize,
        /// Smallest permitted capacity
        min: usize,
        /// Largest permitted capacity
        max: usize,
    },
}

impl BuildError {
    /// Creates a duplicate-group error
    pub fn duplicate_group(group: impl Into<String>) -> Self {
        Self::DuplicateGroupName {
            group: group.into(),
        }
    }

    /// Creates an empty-handler-list error
    pub fn empty_handlers(group: impl Into<String>) -> Self {
        Self::EmptyHandlerList {
            group: group.into(),
        }
    }

    /// Creates an unknown-dependency error
    pub fn unknown_dependency(group: impl Into<String>, token: impl Into<String>) -> Self {
        Self::UnknownDependency {
            group: group.into(),
            token: token.into(),
        }
    }

    /// Creates a cycle error from the ordered path of group names
    pub fn cycle(path: Vec<String>) -> Self {
        Self::DependencyCycle { path }
    }

    /// Creates an unreachable-group error
    pub fn unreachable(group: impl Into<String>) -> Self {
        Self::UnreachableGroup {
            group: group.into(),
        }
    }

    /// Creates an unknown-handler error
    pub fn unknown_handler(group: impl Into<String>, handler: impl Into<String>) -> Self {
        Self::UnknownHandler {
            group: group.into(),
            handler: handler.into(),
        }
    }

    /// Creates an invalid-capacity error for `requested` slots
    pub fn invalid_capacity(requested: usize) -> Self {
        Self::InvalidCapacity {
            requested,
            min: crate::core::MIN_CAPACITY,
            max: crate::core::MAX_CAPACITY,
        }
    }
}
