//! Root selection and skeleton measures.
//!
//! The root is the end branch with the highest average thickness: the
//! thickest tip is taken as the base the structure grows from. Its endpoint
//! and branch are removed from the endpoint lists handed back, so the
//! remaining entries are growth tips only.

use serde::{Deserialize, Serialize};

use crate::classify::DegreeClassification;
use crate::types::{BranchGraph, BranchId, PointId};

/// Error type for root selection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RootError {
    /// The graph has no end branch to choose from.
    #[error("No end branches to select a root from")]
    EmptyInput,
}

/// Thickness statistics over the points of one branch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BranchThickness {
    /// Smallest point thickness.
    pub min: f32,
    /// Largest point thickness.
    pub max: f32,
    /// Mean point thickness.
    pub mean: f64,
}

impl BranchThickness {
    fn from_values(values: impl IntoIterator<Item = f32>) -> Option<Self> {
        let mut count = 0usize;
        let mut sum = 0.0f64;
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        for v in values {
            count += 1;
            sum += f64::from(v);
            min = min.min(v);
            max = max.max(v);
        }
        (count > 0).then(|| Self {
            min,
            max,
            mean: sum / count as f64,
        })
    }
}

/// Thickness statistics for every branch, aligned with branch ids.
///
/// Empty branches get `None`.
pub fn branch_thickness(graph: &BranchGraph) -> Vec<Option<BranchThickness>> {
    graph
        .branches()
        .iter()
        .map(|b| {
            BranchThickness::from_values(
                b.points()
                    .iter()
                    .filter_map(|p| graph.point(*p))
                    .map(|p| p.thickness),
            )
        })
        .collect()
}

/// The chosen root and the remaining tips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootSelection {
    /// Endpoint of the root branch.
    pub root_point: PointId,
    /// The root branch.
    pub root_branch: BranchId,
    /// Average thickness of the root branch.
    pub root_thickness: f64,
    /// Endpoints with the root removed.
    pub end_points: Vec<PointId>,
    /// End branches with the root removed, aligned with `end_points`.
    pub end_branches: Vec<BranchId>,
}

/// Pick the end branch with the largest average thickness.
///
/// Ties keep the first end branch in classifier order. Only the root's own
/// endpoint/branch pair is removed; a free-standing branch keeps its other
/// endpoint in the lists.
pub fn select_root(
    graph: &BranchGraph,
    classes: &DegreeClassification,
) -> Result<RootSelection, RootError> {
    let stats = branch_thickness(graph);

    let mut best: Option<(usize, f64)> = None;
    for (slot, (_, branch)) in classes.end_pairs().enumerate() {
        let Some(mean) = stats.get(branch.index()).copied().flatten().map(|s| s.mean) else {
            continue;
        };
        if best.map_or(true, |(_, top)| mean > top) {
            best = Some((slot, mean));
        }
    }
    let (slot, root_thickness) = best.ok_or(RootError::EmptyInput)?;

    let mut end_points = classes.end_points.clone();
    let mut end_branches = classes.end_branches.clone();
    let root_point = end_points.remove(slot);
    let root_branch = end_branches.remove(slot);

    tracing::debug!(
        %root_point,
        %root_branch,
        root_thickness,
        tips = end_points.len(),
        "root selected"
    );

    Ok(RootSelection {
        root_point,
        root_branch,
        root_thickness,
        end_points,
        end_branches,
    })
}

/// Basic measures of a stable skeleton.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkeletonSummary {
    /// Points in the graph.
    pub num_points: usize,
    /// Branches in the graph.
    pub num_branches: usize,
    /// Endpoint count, root included.
    pub num_end_points: usize,
    /// Junction count.
    pub num_junctions: usize,
    /// Per-branch thickness, aligned with branch ids.
    pub branch_thickness: Vec<Option<BranchThickness>>,
    /// Root and remaining tips, when requested and available.
    pub root: Option<RootSelection>,
}

/// Collect the summary of a stable graph.
///
/// With `with_root` set, a graph without end branches is an error.
pub fn summarize(
    graph: &BranchGraph,
    classes: &DegreeClassification,
    with_root: bool,
) -> Result<SkeletonSummary, RootError> {
    let root = if with_root {
        Some(select_root(graph, classes)?)
    } else {
        None
    };

    Ok(SkeletonSummary {
        num_points: graph.num_points(),
        num_branches: graph.num_branches(),
        num_end_points: classes.end_points.len(),
        num_junctions: classes.junctions.len(),
        branch_thickness: branch_thickness(graph),
        root,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;
    use crate::types::{Branch, Point, PointSet};

    fn graph(thickness: &[f32], branches: &[&[usize]]) -> BranchGraph {
        let points = thickness
            .iter()
            .enumerate()
            .map(|(i, t)| Point {
                source_id: i as u32,
                voxel_index: i,
                voxel: [i, 0, 0],
                position: [i as f64, 0.0, 0.0],
                thickness: *t,
            })
            .collect();
        BranchGraph::new(
            PointSet::from_points(points),
            branches
                .iter()
                .map(|b| Branch::new(b.iter().map(|i| PointId::new(*i)).collect()))
                .collect(),
        )
    }

    #[test]
    fn test_branch_thickness_stats() {
        let g = graph(&[1.0, 2.0, 3.0, 6.0], &[&[0, 1, 2], &[2, 3]]);
        let stats = branch_thickness(&g);
        let first = stats[0].unwrap();
        assert_eq!(first.min, 1.0);
        assert_eq!(first.max, 3.0);
        assert!((first.mean - 2.0).abs() < 1e-9);
        assert!((stats[1].unwrap().mean - 4.5).abs() < 1e-9);
    }

    #[test]
    fn test_thickest_end_branch_is_root() {
        // Star at junction 0; middle arm is thickest.
        let g = graph(
            &[5.0, 1.0, 1.0, 4.0, 4.0, 2.0, 2.0],
            &[&[1, 2, 0], &[3, 4, 0], &[5, 6, 0]],
        );
        let c = classify(&g);
        let sel = select_root(&g, &c).unwrap();
        assert_eq!(sel.root_branch, BranchId::new(1));
        assert_eq!(sel.root_point, PointId::new(3));
        assert_eq!(sel.end_points, vec![PointId::new(1), PointId::new(5)]);
        assert_eq!(sel.end_branches, vec![BranchId::new(0), BranchId::new(2)]);
    }

    #[test]
    fn test_tie_keeps_first_end_branch() {
        let g = graph(&[1.0, 1.0, 1.0], &[&[0, 1, 2]]);
        let c = classify(&g);
        let sel = select_root(&g, &c).unwrap();
        assert_eq!(sel.root_point, PointId::new(0));
        assert_eq!(sel.end_points, vec![PointId::new(2)]);
        assert_eq!(sel.end_branches, vec![BranchId::new(0)]);
    }

    #[test]
    fn test_empty_graph_fails() {
        let g = BranchGraph::default();
        let c = classify(&g);
        assert_eq!(select_root(&g, &c), Err(RootError::EmptyInput));
        assert!(summarize(&g, &c, false).is_ok());
        assert_eq!(summarize(&g, &c, true), Err(RootError::EmptyInput));
    }

    #[test]
    fn test_summary_counts() {
        let g = graph(
            &[5.0, 1.0, 1.0, 4.0, 4.0, 2.0, 2.0],
            &[&[1, 2, 0], &[3, 4, 0], &[5, 6, 0]],
        );
        let c = classify(&g);
        let s = summarize(&g, &c, true).unwrap();
        assert_eq!(s.num_branches, 3);
        assert_eq!(s.num_end_points, 3);
        assert_eq!(s.num_junctions, 1);
        assert_eq!(s.root.map(|r| r.end_points.len()), Some(2));
    }
}
