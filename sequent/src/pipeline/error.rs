//! Runtime error types for a live workflow.
//!
//! Build-time problems are reported as [`BuildError`](crate::graph::BuildError)
//! before any worker starts; everything here can only occur once the
//! workflow is running.

use thiserror::Error;

use super::coordinator::GroupState;

/// Result alias for operations on a running workflow.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors surfaced by a running workflow.
///
/// Handler failures are not listed here: a failing handler faults its
/// own group rather than failing the caller, and the captured
/// [`Fault`](crate::pipeline::Fault) is exposed through
/// [`GroupStatus`](crate::pipeline::GroupStatus).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RuntimeError {
    /// The endpoint was never permitted at build time. The offending
    /// publish is rejected; the workflow keeps running.
    #[error("endpoint '{endpoint}' is not permitted to publish")]
    UnauthorizedPublisher { endpoint: String },

    /// The workflow has been shut down; no further publishes or
    /// restarts are accepted.
    #[error("workflow is stopped")]
    Stopped,

    /// No group with this name exists in the workflow.
    #[error("unknown group '{group}'")]
    UnknownGroup { group: String },

    /// Restart was requested for a group that is not faulted.
    #[error("group '{group}' is {state}, only faulted groups can be restarted")]
    NotFaulted { group: String, state: GroupState },
}

impl RuntimeError {
    /// Rejected publish from an endpoint outside the permitted set.
    pub fn unauthorized(endpoint: impl Into<String>) -> Self {
        Self::UnauthorizedPublisher {
            endpoint: endpoint.into(),
        }
    }

    /// Lookup failure for a group name.
    pub fn unknown_group(group: impl Into<String>) -> Self {
        Self::UnknownGroup {
            group: group.into(),
        }
    }

    /// Restart rejected because the group is still healthy (or already
    /// stopped).
    pub fn not_faulted(group: impl Into<String>, state: GroupState) -> Self {
        Self::NotFaulted {
            group: group.into(),
            state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_names_endpoint() {
        let err = RuntimeError::unauthorized("audit-feed");
        assert_eq!(
            err.to_string(),
            "endpoint 'audit-feed' is not permitted to publish"
        );
    }

    #[test]
    fn test_not_faulted_reports_actual_state() {
        let err = RuntimeError::not_faulted("enrich", GroupState::Running);
        assert!(err.to_string().contains("running"));
        assert!(err.to_string().contains("enrich"));
    }
}
