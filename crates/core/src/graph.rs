//! Migration dependency graph
//!
//! Builds a directed graph from stored migration records and provides the
//! traversals planning is made of: reversal for rollback ordering, reachable
//! closure extraction, and topological sorting.

use std::collections::{BTreeMap, BTreeSet};

use crate::definitions::{MigrationId, MigrationRecord};
use crate::error::{MigratorError, MigratorResult};

/// A node in the migration dependency graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    /// Edge targets: dependency ids in a forward graph, dependent ids in a
    /// reversed one
    pub edges: BTreeSet<MigrationId>,
    /// Whether the migration is currently applied
    pub is_active: bool,
}

/// Directed graph over migration records, keyed by id.
///
/// Ordered collections make every traversal deterministic: ties between
/// independent branches always resolve toward the smaller id. The resulting
/// order is stable but not canonical; any topological order would satisfy
/// the dependency relation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    nodes: BTreeMap<MigrationId, GraphNode>,
}

impl DependencyGraph {
    /// Build the forward graph from a record snapshot.
    ///
    /// A record without a dependency list becomes a node with no edges.
    /// Every referenced id must exist in the snapshot; a dangling reference
    /// fails the build before any traversal can run.
    pub fn build(records: &[MigrationRecord]) -> MigratorResult<Self> {
        let mut nodes = BTreeMap::new();
        for record in records {
            let edges = record.dependencies.clone().unwrap_or_default();
            nodes.insert(
                record.id,
                GraphNode {
                    edges,
                    is_active: record.is_active,
                },
            );
        }

        for (id, node) in &nodes {
            for dependency in &node.edges {
                if !nodes.contains_key(dependency) {
                    return Err(MigratorError::MalformedDependency {
                        migration: *id,
                        dependency: *dependency,
                    });
                }
            }
        }

        tracing::debug!("Built dependency graph with {} nodes", nodes.len());
        Ok(Self { nodes })
    }

    /// Produce the inverse-edge view: each node's edges become the ids that
    /// depend on it. Reversing twice restores the original edge relation.
    pub fn reversed(&self) -> Self {
        let mut nodes: BTreeMap<MigrationId, GraphNode> = self
            .nodes
            .iter()
            .map(|(id, node)| {
                (
                    *id,
                    GraphNode {
                        edges: BTreeSet::new(),
                        is_active: node.is_active,
                    },
                )
            })
            .collect();

        for (id, node) in &self.nodes {
            for dependency in &node.edges {
                if let Some(target) = nodes.get_mut(dependency) {
                    target.edges.insert(*id);
                }
            }
        }

        Self { nodes }
    }

    /// Extract the subgraph reachable from `start` by following edges,
    /// including `start` itself.
    ///
    /// Iterative traversal with an explicit stack; nodes shared between
    /// branches are visited once. Edges of extracted nodes always point
    /// inside the extraction, so the result is safe to sort.
    pub fn subgraph(&self, start: MigrationId) -> MigratorResult<Self> {
        if !self.nodes.contains_key(&start) {
            return Err(MigratorError::UnknownMigration { id: start });
        }

        let mut seen = BTreeSet::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            if let Some(node) = self.nodes.get(&id) {
                for &edge in &node.edges {
                    if !seen.contains(&edge) {
                        stack.push(edge);
                    }
                }
            }
        }

        let nodes = self
            .nodes
            .iter()
            .filter(|(id, _)| seen.contains(*id))
            .map(|(id, node)| (*id, node.clone()))
            .collect();
        Ok(Self { nodes })
    }

    /// Order all nodes so that every edge target appears after the node
    /// pointing at it: in a forward graph, dependencies come after their
    /// dependents. The planner reverses this into execution order.
    ///
    /// Iterative depth-first postorder with an in-progress marker; a cycle
    /// fails the sort with the offending id chain instead of recursing
    /// without bound.
    pub fn topological_sort(&self) -> MigratorResult<Vec<MigrationId>> {
        let mut visited = BTreeSet::new();
        let mut in_progress = BTreeSet::new();
        let mut postorder = Vec::with_capacity(self.nodes.len());

        for &root in self.nodes.keys() {
            if visited.contains(&root) {
                continue;
            }
            let mut stack: Vec<(MigrationId, bool)> = vec![(root, false)];
            while let Some((id, children_done)) = stack.pop() {
                if children_done {
                    in_progress.remove(&id);
                    visited.insert(id);
                    postorder.push(id);
                    continue;
                }
                if visited.contains(&id) {
                    continue;
                }
                if in_progress.contains(&id) {
                    return Err(self.cycle_error(&stack, id));
                }
                in_progress.insert(id);
                stack.push((id, true));
                if let Some(node) = self.nodes.get(&id) {
                    // reversed push order so the smallest id pops first
                    for &edge in node.edges.iter().rev() {
                        if !visited.contains(&edge) {
                            stack.push((edge, false));
                        }
                    }
                }
            }
        }

        // postorder puts edge targets first; callers expect them last
        postorder.reverse();
        tracing::debug!("Topologically sorted {} nodes", postorder.len());
        Ok(postorder)
    }

    /// Reconstruct the cycle path from the active traversal frames.
    fn cycle_error(&self, stack: &[(MigrationId, bool)], id: MigrationId) -> MigratorError {
        let mut path: Vec<MigrationId> = stack
            .iter()
            .filter(|(_, entered)| *entered)
            .map(|(node, _)| *node)
            .collect();
        if let Some(start) = path.iter().position(|&node| node == id) {
            path.drain(..start);
        }
        path.push(id);
        let path = path
            .iter()
            .map(|node| node.to_string())
            .collect::<Vec<_>>()
            .join(" -> ");
        MigratorError::CyclicDependency { path }
    }

    /// Look up a node by id
    pub fn node(&self, id: MigrationId) -> Option<&GraphNode> {
        self.nodes.get(&id)
    }

    /// Whether the graph contains `id`
    pub fn contains(&self, id: MigrationId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Ids of all nodes, ascending
    pub fn ids(&self) -> impl Iterator<Item = MigrationId> + '_ {
        self.nodes.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
