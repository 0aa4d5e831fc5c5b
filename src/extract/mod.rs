//! Skeleton graph extraction from a thinned voxel volume.
//!
//! ```text
//! VoxelVolume → NeighborShells → AdjacencyGraph → trace_branches → raw BranchGraph
//! ```

pub mod adjacency;
pub mod tracer;

pub use adjacency::{build_adjacency, collect_points, connect_shell, ExtractedPoints};
pub use tracer::{trace_branches, TopologyAmbiguity, TraceOutcome};

use crate::shells::NeighborShells;
use crate::types::VoxelVolume;

/// Build the adjacency graph of a volume and trace its raw branches.
pub fn extract_graph<V: VoxelVolume + ?Sized>(volume: &V) -> TraceOutcome {
    let shells = NeighborShells::for_volume(volume);
    let (extracted, adjacency) = build_adjacency(volume, &shells);
    trace_branches(&adjacency, extracted.into_points())
}
