//! Skeleton Graph Binary
//!
//! Reads a JSON voxel volume, optionally thins it with an external tool,
//! extracts the stable skeleton graph and prints the report as JSON.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `SKELETON_POLICY`: path to a JSON policy file (default: built-in v1 policy)
//! - `SKELETON_MIN_END_BRANCH_POINTS`: overrides the pruning threshold
//! - `SKELETON_THINNING_CMD`: thinning command line; the volume is thinned first when set
//! - `SKELETON_THINNING_TIMEOUT_SECS`: thinning time limit (default: 600)
//! - `RUST_LOG`: Log level filter (default: skeleton_graph=info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: json)
//!
//! Logs go to stderr; stdout carries only the report.
//!
//! ## Usage
//!
//! ```bash
//! SKELETON_THINNING_CMD=thin3d cargo run --bin skeleton-graph -- volume.json > report.json
//! ```

use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use skeleton_graph::{
    DenseVolume, ExternalThinner, PipelineReport, SkeletonPipeline, SkeletonPolicyV1,
    ThinningConfig,
};

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "skeleton_graph=info".into());

    if log_format == "pretty" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .flatten_event(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Build the policy from `SKELETON_POLICY` and `SKELETON_MIN_END_BRANCH_POINTS`.
fn load_policy() -> Result<SkeletonPolicyV1, String> {
    let mut policy = match std::env::var("SKELETON_POLICY") {
        Ok(path) => {
            let json = std::fs::read_to_string(&path)
                .map_err(|e| format!("cannot read policy {path}: {e}"))?;
            SkeletonPolicyV1::from_json(&json)
                .map_err(|e| format!("invalid policy {path}: {e}"))?
        }
        Err(_) => SkeletonPolicyV1::default(),
    };

    if let Ok(value) = std::env::var("SKELETON_MIN_END_BRANCH_POINTS") {
        policy.min_end_branch_points = value
            .parse()
            .map_err(|e| format!("invalid SKELETON_MIN_END_BRANCH_POINTS {value:?}: {e}"))?;
    }

    Ok(policy)
}

/// Thinning settings, if `SKELETON_THINNING_CMD` is set.
fn load_thinning() -> Result<Option<ThinningConfig>, String> {
    let Some(mut config) = std::env::var("SKELETON_THINNING_CMD")
        .ok()
        .and_then(|cmd| ThinningConfig::from_command_line(&cmd))
    else {
        return Ok(None);
    };

    if let Ok(value) = std::env::var("SKELETON_THINNING_TIMEOUT_SECS") {
        config.timeout_secs = value
            .parse()
            .map_err(|e| format!("invalid SKELETON_THINNING_TIMEOUT_SECS {value:?}: {e}"))?;
    }

    Ok(Some(config))
}

fn run(path: &str) -> Result<PipelineReport, String> {
    let policy = load_policy()?;
    let thinning = load_thinning()?;

    let bytes = std::fs::read(path).map_err(|e| format!("cannot read volume {path}: {e}"))?;
    let volume: DenseVolume =
        serde_json::from_slice(&bytes).map_err(|e| format!("invalid volume {path}: {e}"))?;
    let volume = volume.validate().map_err(|e| e.to_string())?;

    info!(
        path,
        policy = policy.policy_id(),
        params_hash = %policy.params_hash(),
        thinning = thinning.is_some(),
        "processing volume"
    );

    let pipeline = SkeletonPipeline::new(policy);
    let report = match thinning {
        Some(config) => pipeline.run_with_thinning(&volume, &ExternalThinner::new(config)),
        None => pipeline.run(&volume),
    };
    report.map_err(|e| e.to_string())
}

fn main() -> ExitCode {
    init_tracing();

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("usage: skeleton-graph <volume.json>");
        return ExitCode::from(2);
    };

    match run(&path).and_then(|report| {
        serde_json::to_string_pretty(&report).map_err(|e| e.to_string())
    }) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "skeleton extraction failed");
            ExitCode::FAILURE
        }
    }
}
