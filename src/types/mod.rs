//! Core data model for skeleton extraction.

pub mod volume;
pub mod point;
pub mod adjacency;
pub mod branch;

pub use volume::{VoxelVolume, DenseVolume, VolumeError, OFF_VALUE};
pub use point::{Point, PointId, PointSet};
pub use adjacency::AdjacencyGraph;
pub use branch::{Branch, BranchId, BranchGraph};
