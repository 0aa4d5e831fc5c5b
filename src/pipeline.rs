//! End-to-end skeleton pipeline.
//!
//! ```text
//! [Thinner] → VoxelVolume → extract_graph → GraphCleaner → classify → summarize
//!                                                                        ↓
//!                                                                 PipelineReport
//! ```
//!
//! Every stage consumes its input by value or reference and returns a new
//! value, so independent volumes can be processed on separate threads with
//! separate pipelines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::{classify, DegreeClassification};
use crate::clean::{CleanError, GraphCleaner};
use crate::extract::{extract_graph, TopologyAmbiguity};
use crate::policy::SkeletonPolicyV1;
use crate::root::{summarize, RootError, SkeletonSummary};
use crate::thinning::{Thinner, ThinningError};
use crate::types::{BranchGraph, DenseVolume, VolumeError, VoxelVolume};
use crate::SKELETON_GRAPH_SCHEMA_VERSION;

/// Problems with the input volume itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    /// No voxel is on.
    #[error("Volume has no skeleton voxels")]
    EmptyVolume,
}

/// Error type for the pipeline, naming the stage that failed.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Input rejected before extraction.
    #[error("Input error: {0}")]
    Input(#[from] InputError),
    /// Malformed volume.
    #[error("Volume error: {0}")]
    Volume(#[from] VolumeError),
    /// External thinning failed.
    #[error("Thinning failed: {0}")]
    Thinning(#[from] ThinningError),
    /// Cleaning did not converge.
    #[error("Cleaning failed: {0}")]
    Clean(#[from] CleanError),
    /// Root selection failed.
    #[error("Root selection failed: {0}")]
    Root(#[from] RootError),
}

/// Counters from the cleaning stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanStats {
    /// Points produced by extraction.
    pub raw_points: usize,
    /// Branches produced by tracing.
    pub raw_branches: usize,
    /// Cleaning rounds.
    pub rounds: usize,
    /// End branches pruned.
    pub pruned: usize,
    /// Productive merge scans.
    pub merge_passes: usize,
}

/// Everything the pipeline produced for one volume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    /// Report schema version.
    pub schema_version: String,
    /// Policy version used.
    pub policy_id: String,
    /// Hash of the policy parameters.
    pub params_hash: String,
    /// Skeleton voxels in the input.
    pub input_voxels: usize,
    /// The stable graph.
    pub graph: BranchGraph,
    /// Boundary classification of the stable graph.
    pub classification: DegreeClassification,
    /// Measures and root selection.
    pub summary: SkeletonSummary,
    /// Non-fatal findings from tracing.
    pub ambiguities: Vec<TopologyAmbiguity>,
    /// Cleaning counters.
    pub clean: CleanStats,
    /// Fingerprint of the stable graph.
    pub fingerprint: String,
    /// When the report was produced.
    pub computed_at: DateTime<Utc>,
}

/// Runs extraction, cleaning and root selection under one policy.
#[derive(Debug, Clone, Default)]
pub struct SkeletonPipeline {
    policy: SkeletonPolicyV1,
}

impl SkeletonPipeline {
    /// Create a pipeline.
    pub fn new(policy: SkeletonPolicyV1) -> Self {
        Self { policy }
    }

    /// Policy in use.
    pub fn policy(&self) -> &SkeletonPolicyV1 {
        &self.policy
    }

    /// Process an already thinned volume.
    pub fn run<V: VoxelVolume + ?Sized>(&self, volume: &V) -> Result<PipelineReport, PipelineError> {
        let input_voxels = (0..volume.len()).filter(|i| volume.is_on(*i)).count();
        if input_voxels == 0 {
            return Err(InputError::EmptyVolume.into());
        }

        let traced = extract_graph(volume);
        let raw_points = traced.graph.num_points();
        let raw_branches = traced.graph.num_branches();
        tracing::debug!(raw_points, raw_branches, "extraction complete");

        let cleaned = GraphCleaner::from_policy(&self.policy).clean(traced.graph)?;
        let graph = cleaned.graph;
        let classification = classify(&graph);
        let summary = summarize(&graph, &classification, self.policy.select_root)?;
        let fingerprint = graph.fingerprint();

        tracing::info!(
            input_voxels,
            points = graph.num_points(),
            branches = graph.num_branches(),
            end_points = classification.end_points.len(),
            junctions = classification.junctions.len(),
            ambiguities = traced.ambiguities.len(),
            fingerprint = %fingerprint,
            "skeleton graph extracted"
        );

        Ok(PipelineReport {
            schema_version: SKELETON_GRAPH_SCHEMA_VERSION.to_string(),
            policy_id: self.policy.policy_id().to_string(),
            params_hash: self.policy.params_hash(),
            input_voxels,
            graph,
            classification,
            summary,
            ambiguities: traced.ambiguities,
            clean: CleanStats {
                raw_points,
                raw_branches,
                rounds: cleaned.rounds,
                pruned: cleaned.pruned,
                merge_passes: cleaned.merge_passes,
            },
            fingerprint,
            computed_at: Utc::now(),
        })
    }

    /// Thin a raw volume with `thinner`, then process the skeleton.
    pub fn run_with_thinning(
        &self,
        volume: &DenseVolume,
        thinner: &dyn Thinner,
    ) -> Result<PipelineReport, PipelineError> {
        volume.check()?;
        if volume.count_on() == 0 {
            return Err(InputError::EmptyVolume.into());
        }
        let skeleton = thinner.thin(volume)?;
        self.run(&skeleton)
    }
}
