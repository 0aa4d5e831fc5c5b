//! Degree classification of branch boundary points.
//!
//! The degree of a point is the number of branches that have it as their
//! first or last point. Boundary points are then:
//!
//! - **endpoints**: degree 1
//! - **merge points**: degree 2 (two branches that should be one)
//! - **junctions**: degree >= 3

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::types::{BranchGraph, BranchId, PointId};

/// Classification of every branch boundary point in a graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegreeClassification {
    /// Endpoints, in branch order.
    pub end_points: Vec<PointId>,
    /// Branch of each endpoint; `end_branches[i]` holds `end_points[i]`.
    pub end_branches: Vec<BranchId>,
    /// Junction points, sorted.
    pub junctions: Vec<PointId>,
    /// Merge points, in first-seen order.
    pub merge_points: Vec<PointId>,
    /// Branches incident to each boundary point.
    #[serde(skip)]
    incidence: BTreeMap<PointId, Vec<BranchId>>,
}

impl DegreeClassification {
    /// Number of branches with `id` as a boundary.
    pub fn degree(&self, id: PointId) -> usize {
        self.incidence.get(&id).map(Vec::len).unwrap_or(0)
    }

    /// Branches with `id` as a boundary, in branch order.
    pub fn incident_branches(&self, id: PointId) -> &[BranchId] {
        self.incidence.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether `id` is an endpoint.
    pub fn is_endpoint(&self, id: PointId) -> bool {
        self.degree(id) == 1
    }

    /// Endpoint / end-branch pairs.
    pub fn end_pairs(&self) -> impl Iterator<Item = (PointId, BranchId)> + '_ {
        self.end_points
            .iter()
            .copied()
            .zip(self.end_branches.iter().copied())
    }

    /// End branch ids without repeats, in first-seen order.
    pub fn unique_end_branches(&self) -> Vec<BranchId> {
        let mut seen = BTreeSet::new();
        self.end_branches
            .iter()
            .copied()
            .filter(|b| seen.insert(*b))
            .collect()
    }

    /// Whether no merge points remain.
    pub fn is_merge_free(&self) -> bool {
        self.merge_points.is_empty()
    }
}

/// Classify all branch boundary points.
pub fn classify(graph: &BranchGraph) -> DegreeClassification {
    let mut incidence: BTreeMap<PointId, Vec<BranchId>> = BTreeMap::new();
    for (id, branch) in graph.iter_branches() {
        for point in branch.boundaries() {
            incidence.entry(point).or_default().push(id);
        }
    }

    let mut end_points = Vec::new();
    let mut end_branches = Vec::new();
    let mut junctions = BTreeSet::new();
    let mut merge_points = Vec::new();
    let mut merge_seen = BTreeSet::new();

    for (id, branch) in graph.iter_branches() {
        for point in branch.boundaries() {
            match incidence.get(&point).map(Vec::len).unwrap_or(0) {
                1 => {
                    end_points.push(point);
                    end_branches.push(id);
                }
                2 => {
                    if merge_seen.insert(point) {
                        merge_points.push(point);
                    }
                }
                _ => {
                    junctions.insert(point);
                }
            }
        }
    }

    DegreeClassification {
        end_points,
        end_branches,
        junctions: junctions.into_iter().collect(),
        merge_points,
        incidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Branch, PointSet};

    fn graph(branches: &[&[usize]]) -> BranchGraph {
        BranchGraph::new(
            PointSet::new(),
            branches
                .iter()
                .map(|b| Branch::new(b.iter().map(|i| PointId::new(*i)).collect()))
                .collect(),
        )
    }

    fn ids(v: &[PointId]) -> Vec<usize> {
        v.iter().map(|p| p.index()).collect()
    }

    #[test]
    fn test_single_branch() {
        let c = classify(&graph(&[&[0, 1, 2, 3, 4]]));
        assert_eq!(ids(&c.end_points), vec![0, 4]);
        assert_eq!(c.end_branches, vec![BranchId::new(0), BranchId::new(0)]);
        assert!(c.junctions.is_empty());
        assert!(c.is_merge_free());
        assert_eq!(c.unique_end_branches(), vec![BranchId::new(0)]);
    }

    #[test]
    fn test_star() {
        let c = classify(&graph(&[&[0, 1, 2], &[0, 3, 4], &[5, 6, 0]]));
        assert_eq!(ids(&c.junctions), vec![0]);
        assert_eq!(ids(&c.end_points), vec![2, 4, 5]);
        assert_eq!(
            c.end_branches,
            vec![BranchId::new(0), BranchId::new(1), BranchId::new(2)]
        );
        assert_eq!(c.degree(PointId::new(0)), 3);
    }

    #[test]
    fn test_merge_point_listed_once() {
        let c = classify(&graph(&[&[0, 1, 2], &[2, 3, 4]]));
        assert_eq!(ids(&c.merge_points), vec![2]);
        assert_eq!(
            c.incident_branches(PointId::new(2)),
            &[BranchId::new(0), BranchId::new(1)]
        );
    }

    #[test]
    fn test_closed_branch_counts_once() {
        let c = classify(&graph(&[&[0, 1, 2, 0]]));
        assert_eq!(ids(&c.end_points), vec![0]);
        assert_eq!(c.degree(PointId::new(0)), 1);
    }

    #[test]
    fn test_interior_points_are_ignored() {
        let c = classify(&graph(&[&[0, 1, 2]]));
        assert_eq!(c.degree(PointId::new(1)), 0);
    }
}
