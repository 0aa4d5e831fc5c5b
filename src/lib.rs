//! # skeleton-graph
//!
//! Skeleton graph extraction from thinned 3-D voxel volumes.
//!
//! A one-voxel-wide skeleton is turned into a graph of branches between
//! tips and junctions, cleaned into a canonical form, and given a root.
//!
//! ## Architecture
//!
//! ```text
//! VoxelVolume → NeighborShells → AdjacencyGraph → trace_branches → BranchGraph (raw)
//!                                                                       ↓
//!       RootSelection ← classify ← orient ← compact ← merge ← prune ← orient
//! ```
//!
//! ## Stable Graph Guarantees
//!
//! After [`GraphCleaner::clean`]:
//!
//! - No boundary point is shared by exactly two branches
//! - Every end branch has at least `min_end_branch_points` points
//! - Exactly one connected component remains
//! - Every end branch starts at its endpoint
//!
//! ## Determinism
//!
//! - Same volume + same policy → identical [`BranchGraph::fingerprint`]
//! - Points are numbered in volume scan order, x fastest
//! - Branch order follows tracing order through every cleaning transition

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod shells;
pub mod extract;
pub mod classify;
pub mod clean;
pub mod root;
pub mod policy;
pub mod canonical;
pub mod thinning;
pub mod pipeline;

// Re-exports
pub use types::{
    AdjacencyGraph, Branch, BranchGraph, BranchId, DenseVolume, Point, PointId, PointSet,
    VolumeError, VoxelVolume, OFF_VALUE,
};
pub use shells::{NeighborOffset, NeighborShells};
pub use extract::{
    build_adjacency, collect_points, connect_shell, extract_graph, trace_branches,
    ExtractedPoints, TopologyAmbiguity, TraceOutcome,
};
pub use classify::{classify, DegreeClassification};
pub use clean::{
    compact, component_count, merge, merge_pass, orient, prune, stable_violations, CleanError,
    CleanOutcome, CleanStage, GraphCleaner, MergePass, StableViolation,
};
pub use root::{
    branch_thickness, select_root, summarize, BranchThickness, RootError, RootSelection,
    SkeletonSummary,
};
pub use policy::SkeletonPolicyV1;
pub use canonical::{canonical_hash, canonical_hash_hex, to_canonical_bytes};
pub use thinning::{
    ExternalThinner, JsonVolumeFormat, Thinner, ThinningConfig, ThinningError, VolumeFileFormat,
};
pub use pipeline::{CleanStats, InputError, PipelineError, PipelineReport, SkeletonPipeline};

/// Schema version of [`PipelineReport`].
/// Increment on breaking changes to any serialized type.
pub const SKELETON_GRAPH_SCHEMA_VERSION: &str = "1.0.0";

/// Default policy version identifier.
pub const DEFAULT_POLICY_VERSION: &str = "skeleton_policy_v1";
