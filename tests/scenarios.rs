//! End-to-end scenarios over small hand-built skeletons.

use skeleton_graph::{
    build_adjacency, classify, compact, extract_graph, select_root, DenseVolume, GraphCleaner,
    InputError, NeighborShells, PipelineError, PointId, RootError, SkeletonPipeline,
    SkeletonPolicyV1, VoxelVolume,
};

// ─────────────────────────────────────────────────────────────────────────────
// Test Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn volume_with(dims: [usize; 3], voxels: &[([usize; 3], f32)]) -> DenseVolume {
    let mut vol = DenseVolume::empty(dims);
    for (v, t) in voxels {
        vol.set_on(*v, *t).unwrap();
    }
    vol
}

/// Center (5, 5) with arms along -x and +x of 5 voxels and an arm along +y
/// of `up` voxels. The +y arm carries thickness `up_thickness`.
fn y_shape(up: usize, up_thickness: f32) -> DenseVolume {
    let mut voxels = Vec::new();
    for x in 0..11 {
        voxels.push(([x, 5, 0], 1.0));
    }
    for y in 6..6 + up {
        voxels.push(([5, y, 0], up_thickness));
    }
    volume_with([11, 11, 1], &voxels)
}

fn voxel_of(graph: &skeleton_graph::BranchGraph, id: PointId) -> [usize; 3] {
    graph.point(id).unwrap().voxel
}

// ─────────────────────────────────────────────────────────────────────────────
// Scenario Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_straight_chain_is_single_branch() {
    let vol = volume_with([5, 1, 1], &[0, 1, 2, 3, 4].map(|x| ([x, 0, 0], 1.0f32)));
    let shells = NeighborShells::for_volume(&vol);
    let (_, adjacency) = build_adjacency(&vol, &shells);
    assert_eq!(adjacency.edge_count(), 4);
    assert_eq!(adjacency.degree(PointId::new(0)), 1);
    assert_eq!(adjacency.degree(PointId::new(2)), 2);

    let traced = extract_graph(&vol);
    assert_eq!(traced.graph.num_branches(), 1);
    assert_eq!(traced.graph.branches()[0].len(), 5);

    let classes = classify(&traced.graph);
    assert_eq!(classes.end_points.len(), 2);
    assert!(classes.junctions.is_empty());
}

#[test]
fn test_y_shape_has_one_junction() {
    let traced = extract_graph(&y_shape(5, 1.0));
    assert_eq!(traced.graph.num_branches(), 3);
    assert!(traced.graph.branches().iter().all(|b| b.len() == 6));

    let classes = classify(&traced.graph);
    assert_eq!(classes.junctions.len(), 1);
    let center = classes.junctions[0];
    assert_eq!(voxel_of(&traced.graph, center), [5, 5, 0]);
    assert_eq!(classes.degree(center), 3);
    assert_eq!(classes.end_points.len(), 3);
    assert_eq!(classes.unique_end_branches().len(), 3);
}

#[test]
fn test_short_arm_is_pruned_and_rest_merged() {
    let traced = extract_graph(&y_shape(2, 1.0));
    assert_eq!(traced.graph.num_branches(), 3);

    let outcome = GraphCleaner::new(4).clean(traced.graph).unwrap();
    let graph = outcome.graph;
    assert_eq!(outcome.pruned, 1);
    assert_eq!(graph.num_branches(), 1);
    assert_eq!(graph.branches()[0].len(), 11);
    assert_eq!(graph.num_points(), 11);

    let classes = classify(&graph);
    assert!(classes.junctions.is_empty());
    assert!(classes.merge_points.is_empty());
    assert_eq!(classes.end_points.len(), 2);

    let branch = &graph.branches()[0];
    assert_eq!(voxel_of(&graph, branch.first().unwrap()), [0, 5, 0]);
    assert_eq!(voxel_of(&graph, branch.last().unwrap()), [10, 5, 0]);
}

#[test]
fn test_empty_volume() {
    let vol = DenseVolume::empty([4, 4, 4]);
    let (_, adjacency) = build_adjacency(&vol, &NeighborShells::for_volume(&vol));
    assert!(adjacency.is_empty());

    let traced = extract_graph(&vol);
    assert!(traced.graph.is_empty());

    let classes = classify(&traced.graph);
    assert_eq!(select_root(&traced.graph, &classes), Err(RootError::EmptyInput));

    let err = SkeletonPipeline::default().run(&vol).unwrap_err();
    assert!(matches!(err, PipelineError::Input(InputError::EmptyVolume)));
}

#[test]
fn test_compact_keeps_larger_fragment() {
    let mut voxels: Vec<([usize; 3], f32)> = (0..10).map(|x| ([x, 0, 0], 1.0)).collect();
    voxels.extend((0..3).map(|x| ([x, 5, 0], 1.0)));
    let vol = volume_with([10, 6, 1], &voxels);

    let traced = extract_graph(&vol);
    assert_eq!(traced.graph.num_branches(), 2);
    assert_eq!(traced.graph.num_points(), 13);

    let kept = compact(traced.graph.clone());
    assert_eq!(kept.num_branches(), 1);
    assert_eq!(kept.num_points(), 10);
    assert!(kept.points().iter().all(|(_, p)| p.voxel[1] == 0));

    // Below the pruning threshold compaction alone decides.
    let outcome = GraphCleaner::new(2).clean(traced.graph).unwrap();
    assert_eq!(outcome.graph.num_points(), 10);
}

// ─────────────────────────────────────────────────────────────────────────────
// Pipeline Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_thickest_arm_becomes_root() {
    let report = SkeletonPipeline::default().run(&y_shape(5, 3.0)).unwrap();
    let root = report.summary.root.as_ref().unwrap();

    assert_eq!(voxel_of(&report.graph, root.root_point), [5, 10, 0]);
    assert_eq!(
        report.graph.branch(root.root_branch).unwrap().first(),
        Some(root.root_point)
    );
    assert_eq!(root.end_points.len(), 2);
    assert!(!root.end_points.contains(&root.root_point));
    assert!(!root.end_branches.contains(&root.root_branch));
}

#[test]
fn test_report_ends_are_tip_first() {
    let report = SkeletonPipeline::default().run(&y_shape(5, 1.0)).unwrap();
    for (tip, branch) in report.classification.end_pairs() {
        assert_eq!(report.graph.branch(branch).unwrap().first(), Some(tip));
    }
    assert_eq!(report.clean.raw_branches, 3);
    assert_eq!(report.clean.pruned, 0);
}

#[test]
fn test_diagonal_skeleton_in_3d() {
    let vol = volume_with(
        [5, 5, 5],
        &[0, 1, 2, 3, 4].map(|i| ([i, i, i], 2.0f32)),
    );
    let report = SkeletonPipeline::default().run(&vol).unwrap();
    assert_eq!(report.graph.num_branches(), 1);
    assert_eq!(report.graph.branches()[0].len(), 5);
    assert!((report.summary.branch_thickness[0].unwrap().mean - 2.0).abs() < 1e-9);
}

#[test]
fn test_positions_use_volume_geometry() {
    let vol = DenseVolume::with_geometry([4, 1, 1], [0.5, 1.0, 1.0], [10.0, 0.0, 0.0], vec![1.0; 4])
        .unwrap();
    let report = SkeletonPipeline::new(SkeletonPolicyV1::new(2, true)).run(&vol).unwrap();
    let xs: Vec<f64> = report.graph.points().positions().iter().map(|p| p[0]).collect();
    assert_eq!(xs, vec![10.0, 10.5, 11.0, 11.5]);
    assert_eq!(report.input_voxels, vol.len());
}
