//! External thinning collaborator.
//!
//! A raw voxelized volume is reduced to a one-voxel-wide skeleton by an
//! external executable. The core only sees the [`Thinner`] trait;
//! [`ExternalThinner`] is the subprocess implementation.
//!
//! ## Protocol
//!
//! ```text
//! <work_dir>/<stem>.<ext>          written by us
//! <program> [args..] <work_dir> <stem>
//! <work_dir>/<stem>_skel.<ext>     written by the tool, read back
//! ```
//!
//! The skeleton volume holds medial thickness for skeleton voxels and a
//! negative value elsewhere. The stem is a fresh UUID so concurrent runs
//! sharing a work directory never collide.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::types::{DenseVolume, VoxelVolume};

/// Default time allowed for one thinning run.
pub const DEFAULT_THINNING_TIMEOUT_SECS: u64 = 600;

/// How often a running tool is checked for exit.
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Error type for thinning.
#[derive(Debug, thiserror::Error)]
pub enum ThinningError {
    /// The tool could not be started.
    #[error("Failed to spawn thinning tool `{program}`: {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Reading or writing a volume file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The tool exited unsuccessfully. `None` means it was killed by a signal.
    #[error("Thinning tool exited with status {code:?}")]
    NonZeroExit {
        /// Exit code, if any.
        code: Option<i32>,
    },

    /// The tool ran past its time limit and was killed.
    #[error("Thinning tool timed out after {secs}s")]
    Timeout {
        /// Limit that was exceeded.
        secs: u64,
    },

    /// The tool exited cleanly without writing its output.
    #[error("Thinning tool produced no output at {path}")]
    MissingOutput {
        /// Expected output file.
        path: PathBuf,
    },

    /// A volume file could not be encoded or decoded.
    #[error("Invalid volume file: {0}")]
    Format(String),
}

/// Reduce a volume to its one-voxel-wide skeleton.
pub trait Thinner {
    /// Thin `volume`. The result has the same dimensions.
    fn thin(&self, volume: &DenseVolume) -> Result<DenseVolume, ThinningError>;
}

/// File encoding exchanged with the thinning tool.
pub trait VolumeFileFormat {
    /// File extension without the dot.
    fn extension(&self) -> &str;

    /// Write a volume to `path`.
    fn write(&self, volume: &DenseVolume, path: &Path) -> Result<(), ThinningError>;

    /// Read a volume from `path`.
    fn read(&self, path: &Path) -> Result<DenseVolume, ThinningError>;
}

/// Volumes as serde JSON documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonVolumeFormat;

impl VolumeFileFormat for JsonVolumeFormat {
    fn extension(&self) -> &str {
        "json"
    }

    fn write(&self, volume: &DenseVolume, path: &Path) -> Result<(), ThinningError> {
        let bytes =
            serde_json::to_vec(volume).map_err(|e| ThinningError::Format(e.to_string()))?;
        fs::write(path, bytes).map_err(|source| ThinningError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    fn read(&self, path: &Path) -> Result<DenseVolume, ThinningError> {
        let bytes = fs::read(path).map_err(|source| ThinningError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let volume: DenseVolume =
            serde_json::from_slice(&bytes).map_err(|e| ThinningError::Format(e.to_string()))?;
        volume
            .validate()
            .map_err(|e| ThinningError::Format(e.to_string()))
    }
}

/// Settings for [`ExternalThinner`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThinningConfig {
    /// Executable to run.
    pub program: String,
    /// Arguments placed before the directory and stem.
    pub args: Vec<String>,
    /// Directory for exchange files; the system temp dir when unset.
    pub work_dir: Option<PathBuf>,
    /// Time limit per run.
    pub timeout_secs: u64,
    /// Leave exchange files in place after the run.
    pub keep_files: bool,
}

impl ThinningConfig {
    /// Config for a program with default settings.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// Parse a whitespace-separated command line such as `thin --fast`.
    ///
    /// Returns `None` for a blank line.
    pub fn from_command_line(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace().map(str::to_string);
        let program = words.next()?;
        Some(Self {
            program,
            args: words.collect(),
            ..Self::default()
        })
    }

    /// Set extra arguments.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set the work directory.
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    /// Set the time limit.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Time limit as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Effective work directory.
    pub fn work_dir(&self) -> PathBuf {
        self.work_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

impl Default for ThinningConfig {
    fn default() -> Self {
        Self {
            program: String::new(),
            args: Vec::new(),
            work_dir: None,
            timeout_secs: DEFAULT_THINNING_TIMEOUT_SECS,
            keep_files: false,
        }
    }
}

/// Runs a thinning executable as a blocking subprocess.
#[derive(Debug, Clone)]
pub struct ExternalThinner<F = JsonVolumeFormat> {
    config: ThinningConfig,
    format: F,
}

impl ExternalThinner<JsonVolumeFormat> {
    /// Thinner exchanging JSON volume files.
    pub fn new(config: ThinningConfig) -> Self {
        Self::with_format(config, JsonVolumeFormat)
    }
}

impl<F: VolumeFileFormat> ExternalThinner<F> {
    /// Thinner exchanging files in a custom format.
    pub fn with_format(config: ThinningConfig, format: F) -> Self {
        Self { config, format }
    }

    /// Settings in use.
    pub fn config(&self) -> &ThinningConfig {
        &self.config
    }

    fn run_tool(&self, dir: &Path, stem: &str) -> Result<(), ThinningError> {
        let mut child = Command::new(&self.config.program)
            .args(&self.config.args)
            .arg(dir)
            .arg(stem)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .spawn()
            .map_err(|source| ThinningError::Spawn {
                program: self.config.program.clone(),
                source,
            })?;

        let deadline = Instant::now() + self.config.timeout();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if Instant::now() >= deadline {
                        // Already exited or unkillable: either way we stop waiting.
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(ThinningError::Timeout {
                            secs: self.config.timeout_secs,
                        });
                    }
                    thread::sleep(EXIT_POLL_INTERVAL);
                }
                Err(source) => {
                    return Err(ThinningError::Io {
                        path: PathBuf::from(&self.config.program),
                        source,
                    })
                }
            }
        };

        if status.success() {
            Ok(())
        } else {
            Err(ThinningError::NonZeroExit {
                code: status.code(),
            })
        }
    }
}

impl<F: VolumeFileFormat> Thinner for ExternalThinner<F> {
    fn thin(&self, volume: &DenseVolume) -> Result<DenseVolume, ThinningError> {
        let dir = self.config.work_dir();
        let stem = uuid::Uuid::new_v4().simple().to_string();
        let ext = self.format.extension();
        let input = dir.join(format!("{stem}.{ext}"));
        let output = dir.join(format!("{stem}_skel.{ext}"));

        let _cleanup = ExchangeFiles {
            paths: vec![input.clone(), output.clone()],
            keep: self.config.keep_files,
        };

        self.format.write(volume, &input)?;
        tracing::debug!(
            program = %self.config.program,
            input = %input.display(),
            "running thinning tool"
        );

        let started = Instant::now();
        if let Err(e) = self.run_tool(&dir, &stem) {
            tracing::warn!(error = %e, "thinning tool failed");
            return Err(e);
        }

        if !output.exists() {
            tracing::warn!(output = %output.display(), "thinning tool wrote no output");
            return Err(ThinningError::MissingOutput { path: output });
        }

        let skeleton = self.format.read(&output)?;
        if skeleton.dimensions() != volume.dimensions() {
            return Err(ThinningError::Format(format!(
                "skeleton dimensions {:?} differ from input {:?}",
                skeleton.dimensions(),
                volume.dimensions()
            )));
        }

        tracing::debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            skeleton_voxels = skeleton.count_on(),
            "thinning complete"
        );
        Ok(skeleton)
    }
}

/// Removes exchange files when dropped.
struct ExchangeFiles {
    paths: Vec<PathBuf>,
    keep: bool,
}

impl Drop for ExchangeFiles {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        for path in &self.paths {
            // Missing files are expected when the run failed early.
            let _ = fs::remove_file(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_volume() -> DenseVolume {
        let mut vol = DenseVolume::empty([4, 1, 1]);
        for x in 0..4 {
            vol.set_on([x, 0, 0], 1.0).unwrap();
        }
        vol
    }

    #[test]
    fn test_config_defaults() {
        let config = ThinningConfig::default();
        assert_eq!(config.timeout_secs, 600);
        assert!(!config.keep_files);
        assert_eq!(config.work_dir(), std::env::temp_dir());
    }

    #[test]
    fn test_config_from_command_line() {
        let config = ThinningConfig::from_command_line("  thin3d --fast  -q ").unwrap();
        assert_eq!(config.program, "thin3d");
        assert_eq!(config.args, vec!["--fast", "-q"]);
        assert!(ThinningConfig::from_command_line("   ").is_none());
    }

    #[test]
    fn test_config_deserializes_partial() {
        let config: ThinningConfig = serde_json::from_str(r#"{"program":"thin"}"#).unwrap();
        assert_eq!(config.program, "thin");
        assert_eq!(config.timeout_secs, DEFAULT_THINNING_TIMEOUT_SECS);
    }

    #[test]
    fn test_json_format_reads_back() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("{}.json", uuid::Uuid::new_v4().simple()));
        let vol = line_volume();
        JsonVolumeFormat.write(&vol, &path).unwrap();
        let back = JsonVolumeFormat.read(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(back, vol);
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let thinner = ExternalThinner::new(ThinningConfig::new("/nonexistent/thinning-tool"));
        let err = thinner.thin(&line_volume()).unwrap_err();
        assert!(matches!(err, ThinningError::Spawn { .. }));
    }

    #[cfg(unix)]
    mod unix {
        use super::*;

        fn sh(script: &str) -> ThinningConfig {
            ThinningConfig::new("/bin/sh").with_args(["-c", script, "thin"])
        }

        #[test]
        fn test_copying_tool_round_trips() {
            let thinner = ExternalThinner::new(sh(r#"cp "$1/$2.json" "$1/$2_skel.json""#));
            let vol = line_volume();
            assert_eq!(thinner.thin(&vol).unwrap(), vol);
        }

        #[test]
        fn test_nonzero_exit() {
            let thinner = ExternalThinner::new(sh("exit 3"));
            let err = thinner.thin(&line_volume()).unwrap_err();
            assert!(matches!(err, ThinningError::NonZeroExit { code: Some(3) }));
        }

        #[test]
        fn test_missing_output() {
            let thinner = ExternalThinner::new(sh("true"));
            let err = thinner.thin(&line_volume()).unwrap_err();
            assert!(matches!(err, ThinningError::MissingOutput { .. }));
        }

        #[test]
        fn test_timeout_kills_tool() {
            let thinner = ExternalThinner::new(sh("sleep 5").with_timeout_secs(1));
            let started = Instant::now();
            let err = thinner.thin(&line_volume()).unwrap_err();
            assert!(matches!(err, ThinningError::Timeout { secs: 1 }));
            assert!(started.elapsed() < Duration::from_secs(4));
        }

        #[test]
        fn test_exchange_files_removed() {
            let dir = std::env::temp_dir().join(format!("thin-{}", uuid::Uuid::new_v4().simple()));
            fs::create_dir_all(&dir).unwrap();
            let config = sh(r#"cp "$1/$2.json" "$1/$2_skel.json""#).with_work_dir(&dir);
            ExternalThinner::new(config).thin(&line_volume()).unwrap();
            assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
            fs::remove_dir(&dir).unwrap();
        }

        #[test]
        fn test_keep_files() {
            let dir = std::env::temp_dir().join(format!("thin-{}", uuid::Uuid::new_v4().simple()));
            fs::create_dir_all(&dir).unwrap();
            let mut config = sh(r#"cp "$1/$2.json" "$1/$2_skel.json""#).with_work_dir(&dir);
            config.keep_files = true;
            ExternalThinner::new(config).thin(&line_volume()).unwrap();
            assert_eq!(fs::read_dir(&dir).unwrap().count(), 2);
            fs::remove_dir_all(&dir).unwrap();
        }
    }
}
