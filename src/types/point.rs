//! Skeleton points.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dense index of a point in the current point array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PointId(u32);

impl PointId {
    /// Create a point id from a dense index.
    pub fn new(index: usize) -> Self {
        Self(index as u32)
    }

    /// Position in the point array.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// A skeleton voxel promoted to a graph point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Id assigned at extraction (volume scan order). Survives compaction.
    pub source_id: u32,
    /// Linear index of the voxel in the source volume.
    pub voxel_index: usize,
    /// Grid coordinate of the voxel.
    pub voxel: [usize; 3],
    /// World position.
    pub position: [f64; 3],
    /// Medial thickness carried from the volume.
    pub thickness: f32,
}

/// Arena of points indexed by [`PointId`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointSet {
    points: Vec<Point>,
}

impl PointSet {
    /// Create an empty point set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an ordered list of points.
    pub fn from_points(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Append a point and return its id.
    pub fn push(&mut self, point: Point) -> PointId {
        let id = PointId::new(self.points.len());
        self.points.push(point);
        id
    }

    /// Look up a point.
    pub fn get(&self, id: PointId) -> Option<&Point> {
        self.points.get(id.index())
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether there are no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterate over `(id, point)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (PointId, &Point)> {
        self.points
            .iter()
            .enumerate()
            .map(|(i, p)| (PointId::new(i), p))
    }

    /// Thickness array aligned with point ids.
    pub fn thickness(&self) -> Vec<f32> {
        self.points.iter().map(|p| p.thickness).collect()
    }

    /// World positions aligned with point ids.
    pub fn positions(&self) -> Vec<[f64; 3]> {
        self.points.iter().map(|p| p.position).collect()
    }
}
