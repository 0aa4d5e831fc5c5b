//! SkeletonPolicy v1: terminal-branch pruning threshold and root selection.
//!
//! The policy is hashed canonically so a report can name the exact
//! parameters it was produced with.

use serde::{Deserialize, Serialize};
use crate::canonical::canonical_hash_hex;
use crate::DEFAULT_POLICY_VERSION;

/// Default minimum number of points an end branch must have to survive pruning.
pub const DEFAULT_MIN_END_BRANCH_POINTS: usize = 4;

/// Skeleton policy version 1.
///
/// ## Parameters
///
/// - `min_end_branch_points`: end branches with fewer points are pruned
/// - `select_root`: whether the pipeline picks a root end branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkeletonPolicyV1 {
    /// Policy version identifier.
    pub version: String,
    /// Minimum point count of a terminal branch.
    pub min_end_branch_points: usize,
    /// Whether to run root selection after cleaning.
    pub select_root: bool,
}

impl SkeletonPolicyV1 {
    /// Create a policy with a custom pruning threshold.
    pub fn new(min_end_branch_points: usize, select_root: bool) -> Self {
        Self {
            version: DEFAULT_POLICY_VERSION.to_string(),
            min_end_branch_points,
            select_root,
        }
    }

    /// Parse a policy from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Get the policy ID.
    pub fn policy_id(&self) -> &str {
        &self.version
    }

    /// Compute a hash of the policy parameters.
    pub fn params_hash(&self) -> String {
        canonical_hash_hex(self)
    }
}

impl Default for SkeletonPolicyV1 {
    fn default() -> Self {
        Self {
            version: DEFAULT_POLICY_VERSION.to_string(),
            min_end_branch_points: DEFAULT_MIN_END_BRANCH_POINTS,
            select_root: true,
        }
    }
}
