//! Branch tracer.
//!
//! Contracts maximal chains of degree-2 points into branches that run
//! between non-regular points (degree != 2).
//!
//! ## Algorithm
//!
//! 1. Non-regular points are visited in id order as start points
//! 2. From a start `s`, each neighbor `n` opens a branch `[s, n]` unless `n`
//!    is already a start point or sits next to the far end of a finished
//!    branch
//! 3. The branch advances through degree-2 points; a point already on the
//!    branch (other than `s`) ends the walk without being appended
//! 4. The second-to-last point of each finished branch is recorded so the
//!    same chain is not traced again from its other end
//!
//! Step 3 truncates cycles: the branch stops short of any non-regular point.
//! Components made only of degree-2 points have no start point and produce
//! no branch at all. Both cases are reported as [`TopologyAmbiguity`] and
//! left as they are.

use serde::{Deserialize, Serialize};

use crate::types::{AdjacencyGraph, Branch, BranchGraph, BranchId, PointId, PointSet};

/// Non-fatal topology findings from tracing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TopologyAmbiguity {
    /// A branch walked back into itself and was cut short.
    CycleTruncated {
        /// The truncated branch.
        branch: BranchId,
    },
    /// Degree-2 points not covered by any branch (pure cycles).
    UncoveredCycle {
        /// Number of uncovered points.
        points: usize,
    },
}

/// Result of tracing an adjacency graph.
#[derive(Debug, Clone)]
pub struct TraceOutcome {
    /// The raw branch graph.
    pub graph: BranchGraph,
    /// Findings that the caller may want to inspect.
    pub ambiguities: Vec<TopologyAmbiguity>,
}

/// Trace all branches of an adjacency graph.
///
/// `points` must be the point array the adjacency graph was built over.
pub fn trace_branches(adjacency: &AdjacencyGraph, points: PointSet) -> TraceOutcome {
    let n = adjacency.len();
    let degree: Vec<usize> = (0..n).map(|i| adjacency.degree(PointId::new(i))).collect();

    let mut is_start = vec![false; n];
    let mut is_final = vec![false; n];
    let mut covered = vec![false; n];
    let mut branches: Vec<Branch> = Vec::new();
    let mut ambiguities = Vec::new();

    for s in (0..n).filter(|i| degree[*i] != 2).map(PointId::new) {
        let nbors = adjacency.neighbors(s);

        if nbors.is_empty() {
            covered[s.index()] = true;
            branches.push(Branch::new(vec![s]));
        }

        for &first in nbors {
            if is_final[first.index()] || is_start[first.index()] {
                continue;
            }

            let (points_on_branch, truncated) = walk(adjacency, &degree, s, first);
            if truncated {
                ambiguities.push(TopologyAmbiguity::CycleTruncated {
                    branch: BranchId::new(branches.len()),
                });
            }

            for p in &points_on_branch {
                covered[p.index()] = true;
            }
            let penultimate = points_on_branch[points_on_branch.len() - 2];
            is_final[penultimate.index()] = true;
            branches.push(Branch::new(points_on_branch));
        }

        is_start[s.index()] = true;
    }

    let uncovered = (0..n).filter(|i| !covered[*i]).count();
    if uncovered > 0 {
        ambiguities.push(TopologyAmbiguity::UncoveredCycle { points: uncovered });
    }

    for finding in &ambiguities {
        tracing::warn!(?finding, "topology ambiguity while tracing branches");
    }
    tracing::debug!(
        points = n,
        branches = branches.len(),
        "branch tracing complete"
    );

    TraceOutcome {
        graph: BranchGraph::new(points, branches),
        ambiguities,
    }
}

/// Walk from `start` through `first` while the tail has degree 2.
///
/// Returns the branch points and whether the walk was cut by a cycle.
fn walk(
    adjacency: &AdjacencyGraph,
    degree: &[usize],
    start: PointId,
    first: PointId,
) -> (Vec<PointId>, bool) {
    let mut branch = vec![start, first];
    let mut current = first;

    while degree[current.index()] == 2 {
        let nbors = adjacency.neighbors(current);
        let next = if branch.contains(&nbors[0]) {
            nbors[1]
        } else {
            nbors[0]
        };
        if next != start && branch.contains(&next) {
            return (branch, true);
        }
        branch.push(next);
        current = next;
    }

    (branch, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(i: usize) -> PointId {
        PointId::new(i)
    }

    fn graph_from_edges(n: usize, edges: &[(usize, usize)]) -> AdjacencyGraph {
        let mut g = AdjacencyGraph::with_points(n);
        for (a, b) in edges {
            g.connect(p(*a), p(*b));
        }
        g
    }

    fn trace(n: usize, edges: &[(usize, usize)]) -> TraceOutcome {
        trace_branches(&graph_from_edges(n, edges), PointSet::new())
    }

    fn as_ids(branch: &Branch) -> Vec<usize> {
        branch.points().iter().map(|p| p.index()).collect()
    }

    #[test]
    fn test_path_is_one_branch() {
        let out = trace(5, &[(0, 1), (1, 2), (2, 3), (3, 4)]);
        assert_eq!(out.graph.num_branches(), 1);
        assert_eq!(as_ids(&out.graph.branches()[0]), vec![0, 1, 2, 3, 4]);
        assert!(out.ambiguities.is_empty());
    }

    #[test]
    fn test_two_point_segment() {
        let out = trace(2, &[(0, 1)]);
        assert_eq!(out.graph.num_branches(), 1);
        assert_eq!(as_ids(&out.graph.branches()[0]), vec![0, 1]);
    }

    #[test]
    fn test_star_has_three_branches() {
        // Center 0 with arms 1-2, 3-4, 5-6.
        let out = trace(7, &[(0, 1), (1, 2), (0, 3), (3, 4), (0, 5), (5, 6)]);
        let branches: Vec<_> = out.graph.branches().iter().map(as_ids).collect();
        assert_eq!(branches, vec![vec![0, 1, 2], vec![0, 3, 4], vec![0, 5, 6]]);
    }

    #[test]
    fn test_isolated_point_is_degenerate_branch() {
        let out = trace(3, &[(1, 2)]);
        let branches: Vec<_> = out.graph.branches().iter().map(as_ids).collect();
        assert_eq!(branches, vec![vec![0], vec![1, 2]]);
    }

    #[test]
    fn test_pure_cycle_yields_nothing() {
        let out = trace(4, &[(0, 1), (1, 2), (2, 3), (3, 0)]);
        assert!(out.graph.is_empty());
        assert_eq!(
            out.ambiguities,
            vec![TopologyAmbiguity::UncoveredCycle { points: 4 }]
        );
    }

    #[test]
    fn test_loop_back_to_start_closes_on_start() {
        // 4 is a junction with a loop 4-0-1-4 and leaves 2 and 3.
        let out = trace(5, &[(4, 0), (0, 1), (1, 4), (4, 2), (4, 3)]);
        let branches: Vec<_> = out.graph.branches().iter().map(as_ids).collect();
        assert_eq!(branches, vec![vec![2, 4], vec![3, 4], vec![4, 0, 1, 4]]);
        assert!(out.ambiguities.is_empty());
    }

    #[test]
    fn test_cycle_through_junction_is_truncated() {
        // 0 is a junction with a loop 0-1-2-3-0 and a tail 0-4. Point 3 prefers
        // its lower neighbor 0, already on the branch, and falls back to 2.
        let out = trace(5, &[(0, 1), (1, 2), (2, 3), (3, 0), (0, 4)]);
        let branches: Vec<_> = out.graph.branches().iter().map(as_ids).collect();
        assert_eq!(
            branches,
            vec![vec![0, 1, 2, 3], vec![0, 3, 2, 1], vec![0, 4]]
        );
        assert_eq!(
            out.ambiguities,
            vec![
                TopologyAmbiguity::CycleTruncated { branch: BranchId::new(0) },
                TopologyAmbiguity::CycleTruncated { branch: BranchId::new(1) },
            ]
        );
    }

    #[test]
    fn test_junctions_joined_once() {
        // Two junctions 0 and 5 joined by chain 0-1-2-5, with leaves.
        let out = trace(
            8,
            &[(0, 1), (1, 2), (2, 5), (0, 3), (0, 4), (5, 6), (5, 7)],
        );
        let inner: Vec<_> = out
            .graph
            .branches()
            .iter()
            .map(as_ids)
            .filter(|b| b.len() == 4)
            .collect();
        assert_eq!(inner, vec![vec![0, 1, 2, 5]]);
        assert_eq!(out.graph.num_branches(), 5);
    }
}
