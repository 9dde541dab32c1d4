//! Dependency resolution: groups → validated DAG → execution stages.
//!
//! The resolver turns the string-keyed dependency declarations into an
//! interned graph with a synthetic root standing for the event source,
//! rejects structural mistakes (unknown tokens, cycles, orphans), and
//! derives the stage order the assembler runs: depth 0 is the root, a
//! group's depth is one past its deepest dependency, and groups of equal
//! depth form one stage with no ordering among them.
//!
//! Resolution happens once per workflow build and the result is immutable;
//! every query afterwards is a plain table lookup.

use crate::core::{GroupSpec, SOURCE};
use crate::graph::{BuildError, BuildResult, GroupId, GroupSet};
use petgraph::dot::{Config, Dot};
use petgraph::graph::DiGraph;
use std::collections::HashMap;

/// Groups at one topological depth, eligible to run concurrently.
///
/// Membership order mirrors registration order for deterministic iteration;
/// nothing may rely on it for scheduling, since members of one stage are
/// concurrency-equivalent by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    depth: usize,
    members: Vec<String>,
}

impl Stage {
    /// Topological depth of every member (the root sits at depth 0, so the
    /// first stage of any workflow has depth 1).
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Group names at this depth, in registration order.
    pub fn members(&self) -> &[String] {
        &self.members
    }

    /// Number of groups in the stage.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false: empty stages are never emitted.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// The resolved, immutable dependency graph of a workflow.
///
/// Nodes are the handler groups plus a synthetic root for the event source;
/// edges point from a dependency to its dependents. Internally nodes are
/// interned as dense [`GroupId`]s so the per-node tables are `Vec`-indexed;
/// the public surface speaks group names throughout.
#[derive(Debug, Clone)]
pub struct WorkflowGraph {
    /// Node names; index = `GroupId`, entry 0 is the root sentinel.
    names: Vec<String>,
    name_index: HashMap<String, GroupId>,
    /// Deduplicated dependencies per node, in declared order. Root has none.
    dependencies: Vec<Vec<GroupId>>,
    /// Reverse edges, in registration order of the dependents.
    dependents: Vec<Vec<GroupId>>,
    /// Topological depth per node; root is 0.
    depths: Vec<usize>,
    stages: Vec<Stage>,
}

impl WorkflowGraph {
    /// Resolves a finalized group set into a validated graph.
    ///
    /// # Errors
    ///
    /// - [`BuildError::UnknownDependency`] for a token naming no group
    /// - [`BuildError::DependencyCycle`] with the full cycle path
    /// - [`BuildError::UnreachableGroup`] for a node the root cannot reach
    pub fn resolve(groups: &GroupSet) -> BuildResult<Self> {
        let mut graph = Self::intern(groups)?;
        graph.check_cycles()?;
        graph.check_reachable()?;
        graph.compute_depths();
        graph.build_stages();
        Ok(graph)
    }

    /// Interns names and maps every dependency token to a node edge.
    fn intern(groups: &GroupSet) -> BuildResult<Self> {
        let node_count = groups.len() + 1;
        let mut names = Vec::with_capacity(node_count);
        let mut name_index = HashMap::with_capacity(node_count);

        names.push(SOURCE.to_string());
        for spec in groups.iter() {
            let id = GroupId(names.len() as u32);
            name_index.insert(spec.name().to_string(), id);
            names.push(spec.name().to_string());
        }

        let mut dependencies = vec![Vec::new(); node_count];
        let mut dependents = vec![Vec::new(); node_count];

        for spec in groups.iter() {
            let id = name_index[spec.name()];
            for dep in resolve_tokens(spec, &name_index)? {
                // Duplicate tokens collapse to one edge; re-adding is a no-op.
                if !dependencies[id.index()].contains(&dep) {
                    dependencies[id.index()].push(dep);
                    dependents[dep.index()].push(id);
                }
            }
        }

        Ok(Self {
            names,
            name_index,
            dependencies,
            dependents,
            depths: vec![0; node_count],
            stages: Vec::new(),
        })
    }

    /// Three-color depth-first search over dependency edges.
    ///
    /// White = unvisited, gray = on the current path, black = finished. A
    /// gray node reached again closes a cycle; the path stack reconstructs
    /// it for the diagnostic.
    fn check_cycles(&self) -> BuildResult<()> {
        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Gray,
            Black,
        }

        let mut colors = vec![Color::White; self.names.len()];
        colors[GroupId::ROOT.index()] = Color::Black;

        // Iterative DFS; each frame remembers which dependency to try next.
        for start in 1..self.names.len() {
            if colors[start] != Color::White {
                continue;
            }

            let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
            colors[start] = Color::Gray;

            while let Some(frame) = stack.last_mut() {
                let (node, next) = *frame;
                if next < self.dependencies[node].len() {
                    frame.1 += 1;
                    let dep = self.dependencies[node][next].index();
                    match colors[dep] {
                        Color::White => {
                            colors[dep] = Color::Gray;
                            stack.push((dep, 0));
                        }
                        Color::Gray => {
                            let mut path: Vec<String> = stack
                                .iter()
                                .skip_while(|&&(n, _)| n != dep)
                                .map(|&(n, _)| self.names[n].clone())
                                .collect();
                            path.push(self.names[dep].clone());
                            return Err(BuildError::cycle(path));
                        }
                        Color::Black => {}
                    }
                } else {
                    colors[node] = Color::Black;
                    stack.pop();
                }
            }
        }

        Ok(())
    }

    /// Walks dependent edges from the root and flags anything unvisited.
    ///
    /// With dependency defaulting in place every acyclic node has a chain to
    /// the root, so this cannot fire today; it stays as a structural
    /// invariant check should edge construction ever change.
    fn check_reachable(&self) -> BuildResult<()> {
        let mut seen = vec![false; self.names.len()];
        seen[GroupId::ROOT.index()] = true;

        let mut queue = vec![GroupId::ROOT];
        while let Some(node) = queue.pop() {
            for &dependent in &self.dependents[node.index()] {
                if !seen[dependent.index()] {
                    seen[dependent.index()] = true;
                    queue.push(dependent);
                }
            }
        }

        // Report the first orphan in registration order.
        match seen.iter().position(|&v| !v) {
            Some(orphan) => Err(BuildError::unreachable(self.names[orphan].clone())),
            None => Ok(()),
        }
    }

    /// Kahn's algorithm over dependency counts; depth = 1 + deepest
    /// dependency. Registration order seeds the queue, so equal-depth
    /// processing order is deterministic.
    fn compute_depths(&mut self) {
        let mut remaining: Vec<usize> = self.dependencies.iter().map(Vec::len).collect();
        let mut queue = std::collections::VecDeque::from([GroupId::ROOT]);

        while let Some(node) = queue.pop_front() {
            for &dependent in &self.dependents[node.index()] {
                let depth = self.depths[node.index()] + 1;
                if depth > self.depths[dependent.index()] {
                    self.depths[dependent.index()] = depth;
                }
                remaining[dependent.index()] -= 1;
                if remaining[dependent.index()] == 0 {
                    queue.push_back(dependent);
                }
            }
        }
    }

    /// Buckets group nodes by depth into ascending stages.
    fn build_stages(&mut self) {
        let max_depth = self.depths.iter().copied().max().unwrap_or(0);
        let mut stages: Vec<Stage> = (1..=max_depth)
            .map(|depth| Stage {
                depth,
                members: Vec::new(),
            })
            .collect();

        // Skip the root; GroupId order is registration order.
        for node in 1..self.names.len() {
            let depth = self.depths[node];
            stages[depth - 1].members.push(self.names[node].clone());
        }

        self.stages = stages;
    }

    /// Execution stages in ascending depth order.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Number of handler groups (the synthetic root is not counted).
    pub fn group_count(&self) -> usize {
        self.names.len() - 1
    }

    /// Group names in registration order, root excluded.
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().skip(1).map(String::as_str)
    }

    /// Returns true if a group with this name was resolved.
    pub fn contains(&self, name: &str) -> bool {
        self.name_index.contains_key(name)
    }

    /// Topological depth of a group; the root's dependents are at depth 1.
    pub fn depth_of(&self, name: &str) -> Option<usize> {
        self.name_index.get(name).map(|id| self.depths[id.index()])
    }

    /// The group's resolved dependencies, `"SOURCE"` included, deduplicated,
    /// in declared order.
    pub fn dependencies_of(&self, name: &str) -> Option<Vec<&str>> {
        let id = self.name_index.get(name)?;
        Some(
            self.dependencies[id.index()]
                .iter()
                .map(|dep| self.names[dep.index()].as_str())
                .collect(),
        )
    }

    /// Groups that wait on `name`. Pass [`SOURCE`] for the root's dependents.
    pub fn dependents_of(&self, name: &str) -> Option<Vec<&str>> {
        let id = if name == SOURCE {
            GroupId::ROOT
        } else {
            *self.name_index.get(name)?
        };
        Some(
            self.dependents[id.index()]
                .iter()
                .map(|dep| self.names[dep.index()].as_str())
                .collect(),
        )
    }

    /// Renders the graph in Graphviz DOT format.
    ///
    /// Node labels carry the depth (`journal (d1)`) so a rendered graph
    /// doubles as the stage plan.
    pub fn to_dot(&self) -> String {
        let mut graph = DiGraph::<String, ()>::new();
        let mut node_indices = HashMap::new();

        for (node, name) in self.names.iter().enumerate() {
            let label = if node == GroupId::ROOT.index() {
                name.clone()
            } else {
                format!("{} (d{})", name, self.depths[node])
            };
            node_indices.insert(node, graph.add_node(label));
        }

        for (node, deps) in self.dependencies.iter().enumerate() {
            for dep in deps {
                graph.add_edge(node_indices[&dep.index()], node_indices[&node], ());
            }
        }

        format!("{:?}", Dot::with_config(&graph, &[Config::EdgeNoLabel]))
    }

    /// Writes the DOT rendering to a file (e.g. for `dot -Tpng`).
    pub fn write_dot(&self, path: &str) -> std::io::Result<()> {
        std::fs::write(path, self.to_dot())
    }
}

/// Maps one group's dependency tokens to node ids, applying the
/// default-to-source rule.
fn resolve_tokens(
    spec: &GroupSpec,
    name_index: &HashMap<String, GroupId>,
) -> BuildResult<Vec<GroupId>> {
    if spec.dependencies().is_empty() {
        // Unspecified wait-for means "gate on the raw event store".
        return Ok(vec![GroupId::ROOT]);
    }

    spec.dependencies()
        .iter()
        .map(|token| {
            if token == SOURCE {
                Ok(GroupId::ROOT)
            } else {
                name_index
                    .get(token)
                    .copied()
                    .ok_or_else(|| BuildError::unknown_dependency(spec.name(), token))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GroupRegistry;

    fn resolve(specs: Vec<GroupSpec>) -> BuildResult<WorkflowGraph> {
        let mut registry = GroupRegistry::new();
        for spec in specs {
            registry.register(spec)?;
        }
        WorkflowGraph::resolve(&registry.finalize()?)
    }

    fn group(name: &str) -> GroupSpec {
        GroupSpec::new(name).handler("h")
    }

    #[test]
    fn test_single_group_defaults_to_source() {
        let graph = resolve(vec![group("a")]).unwrap();

        assert_eq!(graph.group_count(), 1);
        assert_eq!(graph.depth_of("a"), Some(1));
        assert_eq!(graph.dependencies_of("a").unwrap(), [SOURCE]);
        assert_eq!(graph.dependents_of(SOURCE).unwrap(), ["a"]);
    }

    #[test]
    fn test_linear_chain_stages() {
        let graph = resolve(vec![
            group("a"),
            group("b").wait_for("a"),
            group("c").wait_for("b"),
        ])
        .unwrap();

        let stages = graph.stages();
        assert_eq!(stages.len(), 3);
        assert_eq!(stages[0].members(), ["a"]);
        assert_eq!(stages[1].members(), ["b"]);
        assert_eq!(stages[2].members(), ["c"]);
        assert_eq!(stages[2].depth(), 3);
    }

    #[test]
    fn test_diamond_depths() {
        // a -> b, a -> c, {b,c} -> d
        let graph = resolve(vec![
            group("a"),
            group("b").wait_for("a"),
            group("c").wait_for("a"),
            group("d").wait_for("b").wait_for("c"),
        ])
        .unwrap();

        assert_eq!(graph.depth_of("a"), Some(1));
        assert_eq!(graph.depth_of("b"), Some(2));
        assert_eq!(graph.depth_of("c"), Some(2));
        assert_eq!(graph.depth_of("d"), Some(3));

        let stages = graph.stages();
        assert_eq!(stages[1].members(), ["b", "c"]);
        assert_eq!(stages[2].members(), ["d"]);
    }

    #[test]
    fn test_depth_is_one_past_deepest_dependency() {
        // d waits on both a (depth 1) and c (depth 3).
        let graph = resolve(vec![
            group("a"),
            group("b").wait_for("a"),
            group("c").wait_for("b"),
            group("d").wait_for("a").wait_for("c"),
        ])
        .unwrap();

        assert_eq!(graph.depth_of("d"), Some(4));
    }

    #[test]
    fn test_unknown_dependency_is_rejected() {
        let err = resolve(vec![group("a").wait_for("missing")]).unwrap_err();
        assert_eq!(err, BuildError::unknown_dependency("a", "missing"));
    }

    #[test]
    fn test_two_group_cycle_names_both() {
        let err = resolve(vec![group("a").wait_for("b"), group("b").wait_for("a")]).unwrap_err();

        match err {
            BuildError::DependencyCycle { path } => {
                assert!(path.contains(&"a".to_string()));
                assert!(path.contains(&"b".to_string()));
                assert_eq!(path.first(), path.last());
            }
            other => panic!("expected DependencyCycle, got {other:?}"),
        }
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let err = resolve(vec![group("a").wait_for("a")]).unwrap_err();
        assert_eq!(err, BuildError::cycle(vec!["a".into(), "a".into()]));
    }

    #[test]
    fn test_three_group_cycle_path_is_ordered() {
        let err = resolve(vec![
            group("a").wait_for("c"),
            group("b").wait_for("a"),
            group("c").wait_for("b"),
        ])
        .unwrap_err();

        match err {
            BuildError::DependencyCycle { path } => {
                assert_eq!(path.len(), 4);
                assert_eq!(path.first(), path.last());
            }
            other => panic!("expected DependencyCycle, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_source_tokens_collapse() {
        let graph = resolve(vec![group("a").wait_for(SOURCE).wait_for(SOURCE)]).unwrap();
        assert_eq!(graph.dependencies_of("a").unwrap(), [SOURCE]);

        // Identical to declaring it once (or not at all).
        let plain = resolve(vec![group("a")]).unwrap();
        assert_eq!(
            graph.dependencies_of("a").unwrap(),
            plain.dependencies_of("a").unwrap()
        );
    }

    #[test]
    fn test_duplicate_group_tokens_collapse() {
        let graph = resolve(vec![
            group("a"),
            group("b").wait_for("a").wait_for("a").wait_for(SOURCE),
        ])
        .unwrap();

        assert_eq!(graph.dependencies_of("b").unwrap(), ["a", SOURCE]);
        assert_eq!(graph.depth_of("b"), Some(2));
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let specs = || {
            vec![
                group("ingest"),
                group("enrich").wait_for("ingest"),
                group("journal").wait_for("ingest"),
                group("publish").wait_for("enrich").wait_for("journal"),
            ]
        };

        let first = resolve(specs()).unwrap();
        for _ in 0..10 {
            let again = resolve(specs()).unwrap();
            assert_eq!(first.stages(), again.stages());
        }
    }

    #[test]
    fn test_mixed_source_and_group_dependency() {
        let graph = resolve(vec![group("a"), group("b").wait_for(SOURCE).wait_for("a")]).unwrap();

        assert_eq!(graph.dependencies_of("b").unwrap(), [SOURCE, "a"]);
        // Depth counts the deepest path, not the shortcut to the root.
        assert_eq!(graph.depth_of("b"), Some(2));
    }

    #[test]
    fn test_to_dot_contains_nodes_and_depths() {
        let graph = resolve(vec![group("a"), group("b").wait_for("a")]).unwrap();
        let dot = graph.to_dot();

        assert!(dot.starts_with("digraph"));
        assert!(dot.contains("a (d1)"));
        assert!(dot.contains("b (d2)"));
        assert!(dot.contains(SOURCE));
    }
}
