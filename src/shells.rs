//! Neighbor shells for voxel connectivity.
//!
//! Offsets of the 3x3x3 neighborhood are grouped by the squared lattice
//! distance of their step from the origin:
//!
//! | shell | squared distance | size |
//! |-------|------------------|------|
//! | `face` | 1 | 6 |
//! | `face_edge` | <= 2 | 18 |
//! | `edge` | 2 | 12 |
//! | `full` | <= 3 | 26 |
//! | `corner` | 3 | 8 |
//!
//! The adjacency builder consumes `face`, `edge`, `corner` in that order.

use serde::{Deserialize, Serialize};

use crate::types::VoxelVolume;

/// One neighbor offset: the lattice step and its linear index delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NeighborOffset {
    /// Step along x, y, z (each in -1..=1).
    pub step: [i8; 3],
    /// Linear index delta for the volume the shells were built for.
    pub delta: isize,
}

impl NeighborOffset {
    /// Squared Euclidean length of the step.
    pub fn distance2(&self) -> u8 {
        self.step.iter().map(|s| (s * s) as u8).sum()
    }

    /// Apply the step to a voxel coordinate, returning `None` when the
    /// result leaves a volume of the given dimensions.
    pub fn apply(&self, voxel: [usize; 3], dims: [usize; 3]) -> Option<[usize; 3]> {
        let mut out = [0usize; 3];
        for axis in 0..3 {
            let v = voxel[axis] as isize + self.step[axis] as isize;
            if v < 0 || v >= dims[axis] as isize {
                return None;
            }
            out[axis] = v as usize;
        }
        Some(out)
    }
}

/// Neighbor offsets grouped by connectivity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborShells {
    /// 6-connectivity (distance² = 1).
    pub face: Vec<NeighborOffset>,
    /// 18-connectivity (distance² <= 2).
    pub face_edge: Vec<NeighborOffset>,
    /// 18-connectivity minus 6 (distance² = 2).
    pub edge: Vec<NeighborOffset>,
    /// 26-connectivity (distance² <= 3).
    pub full: Vec<NeighborOffset>,
    /// 26-connectivity minus 18 (distance² = 3).
    pub corner: Vec<NeighborOffset>,
}

impl NeighborShells {
    /// Build the shells from the x, y, z linear-index strides.
    pub fn from_increments(increments: [isize; 3]) -> Self {
        let mut shells = Self {
            face: Vec::with_capacity(6),
            face_edge: Vec::with_capacity(18),
            edge: Vec::with_capacity(12),
            full: Vec::with_capacity(26),
            corner: Vec::with_capacity(8),
        };

        for x in -1i8..=1 {
            for y in -1i8..=1 {
                for z in -1i8..=1 {
                    if x == 0 && y == 0 && z == 0 {
                        continue;
                    }
                    let offset = NeighborOffset {
                        step: [x, y, z],
                        delta: x as isize * increments[0]
                            + y as isize * increments[1]
                            + z as isize * increments[2],
                    };
                    let dist = offset.distance2();
                    if dist == 1 {
                        shells.face.push(offset);
                    }
                    if dist <= 2 {
                        shells.face_edge.push(offset);
                    }
                    if dist == 2 {
                        shells.edge.push(offset);
                    }
                    if dist == 3 {
                        shells.corner.push(offset);
                    }
                    shells.full.push(offset);
                }
            }
        }

        shells
    }

    /// Build the shells for a volume's indexing.
    pub fn for_volume<V: VoxelVolume + ?Sized>(volume: &V) -> Self {
        Self::from_increments(volume.increments())
    }

    /// Disjoint shells in connection priority: face, then edge, then corner.
    pub fn priority_order(&self) -> [&[NeighborOffset]; 3] {
        [&self.face, &self.edge, &self.corner]
    }
}
