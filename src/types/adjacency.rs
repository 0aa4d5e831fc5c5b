//! Undirected voxel adjacency graph.

use serde::{Deserialize, Serialize};

use super::point::PointId;

/// Undirected graph over point ids.
///
/// Each neighbor list is kept sorted and free of duplicates. Edges are always
/// inserted in both directions, so the graph stays symmetric and, since
/// [`AdjacencyGraph::connect`] ignores `a == b`, loop-free.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjacencyGraph {
    neighbors: Vec<Vec<PointId>>,
}

impl AdjacencyGraph {
    /// Create a graph with `n` isolated points.
    pub fn with_points(n: usize) -> Self {
        Self {
            neighbors: vec![Vec::new(); n],
        }
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    /// Whether the graph has no points.
    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    /// Sorted neighbors of a point.
    pub fn neighbors(&self, id: PointId) -> &[PointId] {
        self.neighbors
            .get(id.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of neighbors of a point.
    pub fn degree(&self, id: PointId) -> usize {
        self.neighbors(id).len()
    }

    /// Whether `a` and `b` are directly connected.
    pub fn contains_edge(&self, a: PointId, b: PointId) -> bool {
        self.neighbors(a).binary_search(&b).is_ok()
    }

    /// Whether some neighbor of `source` is adjacent to `dest`.
    ///
    /// This is the two-hop redundancy test: only paths of exactly two edges
    /// are considered.
    pub fn has_two_hop_path(&self, source: PointId, dest: PointId) -> bool {
        self.neighbors(source)
            .iter()
            .any(|mid| self.contains_edge(*mid, dest))
    }

    /// Insert the undirected edge `a - b`.
    pub fn connect(&mut self, a: PointId, b: PointId) {
        if a == b || a.index() >= self.len() || b.index() >= self.len() {
            return;
        }
        insert_sorted(&mut self.neighbors[a.index()], b);
        insert_sorted(&mut self.neighbors[b.index()], a);
    }

    /// Total number of undirected edges.
    pub fn edge_count(&self) -> usize {
        self.neighbors.iter().map(Vec::len).sum::<usize>() / 2
    }

    /// Iterate over `(id, neighbors)` in id order.
    pub fn iter(&self) -> impl Iterator<Item = (PointId, &[PointId])> {
        self.neighbors
            .iter()
            .enumerate()
            .map(|(i, n)| (PointId::new(i), n.as_slice()))
    }

    /// Check that every edge is present in both directions.
    pub fn is_symmetric(&self) -> bool {
        self.iter()
            .all(|(p, ns)| ns.iter().all(|q| self.contains_edge(*q, p)))
    }
}

fn insert_sorted(list: &mut Vec<PointId>, id: PointId) {
    if let Err(pos) = list.binary_search(&id) {
        list.insert(pos, id);
    }
}
