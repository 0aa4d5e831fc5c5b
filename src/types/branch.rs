//! Branches and branch graphs.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::canonical::canonical_hash_hex;
use super::point::{Point, PointId, PointSet};

/// Index of a branch in a [`BranchGraph`].
///
/// Only meaningful for the graph it was taken from: every cleaning
/// transition builds a new branch list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BranchId(u32);

impl BranchId {
    /// Create a branch id from a position in the branch list.
    pub fn new(index: usize) -> Self {
        Self(index as u32)
    }

    /// Position in the branch list.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

/// Ordered chain of points forming one edge of the skeleton graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Branch(Vec<PointId>);

impl Branch {
    /// Create a branch from an ordered point sequence.
    pub fn new(points: Vec<PointId>) -> Self {
        Self(points)
    }

    /// Points in order.
    pub fn points(&self) -> &[PointId] {
        &self.0
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the branch has no points.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First point.
    pub fn first(&self) -> Option<PointId> {
        self.0.first().copied()
    }

    /// Last point.
    pub fn last(&self) -> Option<PointId> {
        self.0.last().copied()
    }

    /// Boundary points, listed once each.
    ///
    /// A single-point branch yields one boundary; a closed branch whose
    /// first and last points coincide also yields one.
    pub fn boundaries(&self) -> Vec<PointId> {
        match (self.first(), self.last()) {
            (Some(a), Some(b)) if a == b => vec![a],
            (Some(a), Some(b)) => vec![a, b],
            _ => Vec::new(),
        }
    }

    /// Same points in reverse order.
    pub fn reversed(&self) -> Self {
        Self(self.0.iter().rev().copied().collect())
    }

    /// Consume into the point sequence.
    pub fn into_points(self) -> Vec<PointId> {
        self.0
    }
}

/// Branches plus the point array they index into.
///
/// Transitions never edit a graph in place; they consume one value and
/// return a new one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BranchGraph {
    points: PointSet,
    branches: Vec<Branch>,
}

/// Serialized shape of a graph fingerprint.
#[derive(Serialize)]
struct FingerprintInput<'a> {
    source_ids: Vec<u32>,
    branches: &'a [Branch],
}

impl BranchGraph {
    /// Create a graph.
    pub fn new(points: PointSet, branches: Vec<Branch>) -> Self {
        Self { points, branches }
    }

    /// Split into points and branches.
    pub fn into_parts(self) -> (PointSet, Vec<Branch>) {
        (self.points, self.branches)
    }

    /// Point array.
    pub fn points(&self) -> &PointSet {
        &self.points
    }

    /// Look up a point.
    pub fn point(&self, id: PointId) -> Option<&Point> {
        self.points.get(id)
    }

    /// Branch list.
    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    /// Look up a branch.
    pub fn branch(&self, id: BranchId) -> Option<&Branch> {
        self.branches.get(id.index())
    }

    /// Iterate over `(id, branch)` pairs.
    pub fn iter_branches(&self) -> impl Iterator<Item = (BranchId, &Branch)> {
        self.branches
            .iter()
            .enumerate()
            .map(|(i, b)| (BranchId::new(i), b))
    }

    /// Number of branches.
    pub fn num_branches(&self) -> usize {
        self.branches.len()
    }

    /// Number of points in the point array.
    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    /// Whether there are no branches.
    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    /// Thickness scalars aligned with point ids.
    pub fn thickness(&self) -> Vec<f32> {
        self.points.thickness()
    }

    /// Canonical hash over point identities and branch sequences.
    ///
    /// Two graphs with the same fingerprint have the same topology over the
    /// same extracted points.
    pub fn fingerprint(&self) -> String {
        let input = FingerprintInput {
            source_ids: self.points.iter().map(|(_, p)| p.source_id).collect(),
            branches: &self.branches,
        };
        canonical_hash_hex(&input)
    }
}
