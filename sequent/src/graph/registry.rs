//! Group registration and shape validation.
//!
//! The registry is the first gate a spec passes through: per-group shape
//! checks happen on `register`, the zero-groups check on `finalize`. What
//! comes out is a [`GroupSet`], an immutable, insertion-ordered mapping the
//! resolver consumes. Keeping the ordered view here (rather than sorting
//! later) is what makes stage iteration deterministic for a fixed spec.

use crate::core::GroupSpec;
use crate::graph::{BuildError, BuildResult};
use std::collections::HashMap;

/// Collects and validates group specs before graph resolution.
///
/// # Example
///
/// ```
/// use sequent::core::GroupSpec;
/// use sequent::graph::GroupRegistry;
///
/// let mut registry = GroupRegistry::new();
/// registry.register(GroupSpec::new("journal").handler("write_journal"))?;
/// registry.register(GroupSpec::new("audit").handler("audit_trail").wait_for("journal"))?;
/// let groups = registry.finalize()?;
/// assert_eq!(groups.len(), 2);
/// # Ok::<(), sequent::graph::BuildError>(())
/// ```
#[derive(Debug, Default)]
pub struct GroupRegistry {
    specs: Vec<GroupSpec>,
    index: HashMap<String, usize>,
}

impl GroupRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one group, validating its shape.
    ///
    /// # Errors
    ///
    /// - [`BuildError::MissingGroupName`] if the name is blank
    /// - [`BuildError::EmptyHandlerList`] if the group has no handlers
    /// - [`BuildError::DuplicateGroupName`] if the name is already taken
    pub fn register(&mut self, group: GroupSpec) -> BuildResult<()> {
        if group.name().trim().is_empty() {
            return Err(BuildError::MissingGroupName);
        }
        if group.handler_names().is_empty() {
            return Err(BuildError::empty_handlers(group.name()));
        }
        if self.index.contains_key(group.name()) {
            return Err(BuildError::duplicate_group(group.name()));
        }

        self.index.insert(group.name().to_string(), self.specs.len());
        self.specs.push(group);
        Ok(())
    }

    /// Number of groups registered so far.
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Returns true if nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Freezes the registry into an immutable [`GroupSet`].
    ///
    /// # Errors
    ///
    /// [`BuildError::NoGroupsDefined`] if zero groups were registered.
    pub fn finalize(self) -> BuildResult<GroupSet> {
        if self.specs.is_empty() {
            return Err(BuildError::NoGroupsDefined);
        }
        Ok(GroupSet {
            specs: self.specs,
            index: self.index,
        })
    }
}

/// Immutable name → [`GroupSpec`] mapping in registration order.
///
/// Produced only by [`GroupRegistry::finalize`]; nothing can be added or
/// removed afterwards.
#[derive(Debug, Clone)]
pub struct GroupSet {
    specs: Vec<GroupSpec>,
    index: HashMap<String, usize>,
}

impl GroupSet {
    /// Looks up a group by name.
    pub fn get(&self, name: &str) -> Option<&GroupSpec> {
        self.index.get(name).map(|&i| &self.specs[i])
    }

    /// Returns true if a group with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Iterates groups in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &GroupSpec> {
        self.specs.iter()
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Always false: an empty set cannot be finalized.
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
