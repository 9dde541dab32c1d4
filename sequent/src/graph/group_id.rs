//! Interned group identifier.
//!
//! The resolved graph keys nodes by a small integer instead of the group's
//! string name: edges, depth tables, and stage sets become `Vec`-indexable,
//! and a mistyped name cannot silently alias another group once resolution
//! has happened. The public contract still speaks in names; `GroupId` never
//! crosses the crate boundary except through diagnostics.

use std::fmt;

/// Index of a group node inside a resolved [`WorkflowGraph`](super::WorkflowGraph).
///
/// Ids are dense: the synthetic source node is always id 0 and group nodes
/// follow in registration order, so a `GroupId` doubles as an index into the
/// graph's per-node tables.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub(crate) u32);

impl GroupId {
    /// The synthetic root node standing for the event source.
    pub(crate) const ROOT: GroupId = GroupId(0);

    /// Returns the id as a table index.
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

impl fmt::Debug for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GroupId({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_debug() {
        let id = GroupId(3);
        assert_eq!(format!("{}", id), "g3");
        assert_eq!(format!("{:?}", id), "GroupId(3)");
    }

    #[test]
    fn test_root_is_zero() {
        assert_eq!(GroupId::ROOT.index(), 0);
    }

    #[test]
    fn test_ordering_follows_index() {
        assert!(GroupId(1) < GroupId(2));
        assert_eq!(GroupId(2), GroupId(2));
    }
}
