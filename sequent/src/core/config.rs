//! Pipeline tuning knobs.
//!
//! Everything here is fixed at build time; there is no runtime reconfiguration
//! surface. Capacity bounds are enforced when the workflow is built, not here,
//! so a `PipelineConfig` is always constructible (e.g. from deserialized
//! input) and only `build_workflow` rejects bad values.

use serde::{Deserialize, Serialize};
use std::time::Duration;

// =============================================================================
// CAPACITY BOUNDS
// =============================================================================

/// Default number of event slots in the store.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Smallest permitted store capacity.
pub const MIN_CAPACITY: usize = 4;

/// Largest permitted store capacity (1M slots).
pub const MAX_CAPACITY: usize = 1 << 20;

// =============================================================================
// PIPELINE CONFIG
// =============================================================================

/// Configuration for an assembled pipeline.
///
/// # Examples
///
/// ```
/// use sequent::core::PipelineConfig;
/// use std::time::Duration;
///
/// // Defaults are fine for most pipelines.
/// let config = PipelineConfig::default();
/// assert_eq!(config.capacity, 1024);
///
/// // Tune for a latency-sensitive deployment.
/// let config = PipelineConfig {
///     capacity: 64,
///     liveness_timeout: Some(Duration::from_millis(250)),
/// };
/// assert!(config.capacity.is_power_of_two());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of event slots in the shared store.
    ///
    /// Must be a power of two within `[MIN_CAPACITY, MAX_CAPACITY]` because
    /// the store indexes slots with a bitmask. Violations fail workflow
    /// construction with `InvalidCapacity`; nothing is rounded silently.
    ///
    /// Default: 1024
    pub capacity: usize,

    /// How long a suspended wait (gate or backpressure) may park before a
    /// liveness warning is logged and the wait resumes.
    ///
    /// Expiry is diagnostic only; it never fails the wait. `None` parks
    /// indefinitely, which is safe (shutdown still wakes every waiter) but
    /// gives up the "pipeline X has been stalled for a while" log line.
    ///
    /// Default: 1 second
    pub liveness_timeout: Option<Duration>,
}

impl PipelineConfig {
    /// The default configuration as a `const`, for embedding in statics.
    pub const DEFAULT: Self = Self {
        capacity: DEFAULT_CAPACITY,
        liveness_timeout: Some(Duration::from_secs(1)),
    };

    /// Returns a config with the given capacity and default timeouts.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::DEFAULT
        }
    }

    /// Returns true if `capacity` is acceptable to the store.
    pub fn capacity_is_valid(&self) -> bool {
        self.capacity.is_power_of_two() && (MIN_CAPACITY..=MAX_CAPACITY).contains(&self.capacity)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
