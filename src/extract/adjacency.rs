//! Voxel adjacency builder.
//!
//! Every "on" voxel becomes a point. Edges are added shell by shell, finest
//! connectivity first, and a candidate edge is skipped when its endpoints are
//! already joined by a path of exactly two edges in the graph built so far.
//!
//! The two-hop check is a bounded lookahead. Longer indirect paths are not
//! detected, so the result can keep locally redundant edges; it is neither a
//! spanning tree nor minimal. Output depends on scan and shell order, which
//! is why each shell pass takes the graph by value and hands back the next.

use std::collections::HashMap;

use crate::shells::{NeighborOffset, NeighborShells};
use crate::types::{AdjacencyGraph, Point, PointId, PointSet, VoxelVolume};

/// Points created from a volume, with the voxel-to-point lookup.
#[derive(Debug, Clone, Default)]
pub struct ExtractedPoints {
    points: PointSet,
    by_voxel: HashMap<usize, PointId>,
}

impl ExtractedPoints {
    /// Point array in scan order.
    pub fn points(&self) -> &PointSet {
        &self.points
    }

    /// Point created for a voxel index, if that voxel is on.
    pub fn point_at(&self, voxel_index: usize) -> Option<PointId> {
        self.by_voxel.get(&voxel_index).copied()
    }

    /// Voxel index a point was created from.
    pub fn voxel_of(&self, id: PointId) -> Option<usize> {
        self.points.get(id).map(|p| p.voxel_index)
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether no voxel was on.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Drop the lookup and keep the point array.
    pub fn into_points(self) -> PointSet {
        self.points
    }
}

/// Assign sequential point ids to all "on" voxels in scan order.
pub fn collect_points<V: VoxelVolume + ?Sized>(volume: &V) -> ExtractedPoints {
    let mut points = PointSet::new();
    let mut by_voxel = HashMap::new();

    for index in 0..volume.len() {
        if !volume.is_on(index) {
            continue;
        }
        let voxel = volume.voxel_of(index);
        let id = points.push(Point {
            source_id: points.len() as u32,
            voxel_index: index,
            voxel,
            position: volume.position_of(voxel),
            thickness: volume.thickness(index),
        });
        by_voxel.insert(index, id);
    }

    ExtractedPoints { points, by_voxel }
}

/// Run one shell pass over all points.
///
/// Candidate edges are visited in point order, then offset order, and each
/// accepted edge is visible to the redundancy test of later candidates.
///
/// Neighbors are located from each offset's lattice step and the indexing
/// of `volume`; the offset's linear delta is not used, so shells built for
/// another volume still find the right voxels.
pub fn connect_shell<V: VoxelVolume + ?Sized>(
    mut graph: AdjacencyGraph,
    volume: &V,
    extracted: &ExtractedPoints,
    shell: &[NeighborOffset],
) -> AdjacencyGraph {
    for (id, point) in extracted.points().iter() {
        for offset in shell {
            let Some(nbor) = neighbor_point(volume, point, offset, extracted) else {
                continue;
            };
            if !graph.has_two_hop_path(id, nbor) {
                graph.connect(id, nbor);
            }
        }
    }

    graph
}

/// Build the full adjacency graph of a volume.
pub fn build_adjacency<V: VoxelVolume + ?Sized>(
    volume: &V,
    shells: &NeighborShells,
) -> (ExtractedPoints, AdjacencyGraph) {
    let extracted = collect_points(volume);
    let mut graph = AdjacencyGraph::with_points(extracted.len());

    for (pass, shell) in shells.priority_order().into_iter().enumerate() {
        graph = connect_shell(graph, volume, &extracted, shell);
        tracing::debug!(
            pass,
            offsets = shell.len(),
            edges = graph.edge_count(),
            "adjacency shell pass complete"
        );
    }

    (extracted, graph)
}

fn neighbor_point<V: VoxelVolume + ?Sized>(
    volume: &V,
    point: &Point,
    offset: &NeighborOffset,
    extracted: &ExtractedPoints,
) -> Option<PointId> {
    // Stepping in grid coordinates never wraps across a volume face.
    let voxel = offset.apply(point.voxel, volume.dimensions())?;
    extracted.point_at(volume.linear_index(voxel)?)
}
