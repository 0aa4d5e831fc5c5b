//! Voxel volume input types.
//!
//! The core never reads volume files itself. Callers hand it anything that
//! implements [`VoxelVolume`]; [`DenseVolume`] is the in-memory implementation
//! used by the pipeline, the thinning collaborator and the tests.

use serde::{Deserialize, Serialize};

/// Error type for malformed volumes.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VolumeError {
    /// Scalar buffer does not match the declared dimensions.
    #[error("Volume size mismatch: expected {expected} scalars, got {actual}")]
    SizeMismatch {
        /// Number of voxels implied by the dimensions.
        expected: usize,
        /// Number of scalars supplied.
        actual: usize,
    },
    /// Spacing must be positive and finite on every axis.
    #[error("Invalid voxel spacing: {0:?}")]
    InvalidSpacing([f64; 3]),
    /// Dimensions whose voxel count does not fit in `usize`.
    #[error("Volume dimensions {dims:?} are too large")]
    TooLarge {
        /// Declared dimensions.
        dims: [usize; 3],
    },
    /// Thickness of an "on" voxel must be finite and non-negative.
    #[error("Invalid thickness {thickness} at voxel {voxel:?}")]
    InvalidThickness {
        /// Target voxel.
        voxel: [usize; 3],
        /// Rejected value.
        thickness: f32,
    },
    /// Voxel coordinate outside the volume.
    #[error("Voxel {voxel:?} outside volume of dimensions {dims:?}")]
    OutOfBounds {
        /// Requested voxel coordinate.
        voxel: [usize; 3],
        /// Volume dimensions.
        dims: [usize; 3],
    },
}

/// Number of voxels for `dims`, or `None` if it overflows `usize`.
pub fn voxel_count(dims: [usize; 3]) -> Option<usize> {
    dims[0].checked_mul(dims[1])?.checked_mul(dims[2])
}

/// Read access to a 3-D scalar voxel field.
///
/// Linear indices follow x-fastest scan order: `i + j * nx + k * nx * ny`.
pub trait VoxelVolume {
    /// Number of voxels along x, y and z.
    fn dimensions(&self) -> [usize; 3];

    /// Physical size of a voxel along each axis.
    fn spacing(&self) -> [f64; 3];

    /// World position of voxel (0, 0, 0).
    fn origin(&self) -> [f64; 3];

    /// Whether the voxel at `index` belongs to the structure.
    fn is_on(&self, index: usize) -> bool;

    /// Medial thickness stored at `index`.
    fn thickness(&self, index: usize) -> f32;

    /// Total number of voxels.
    ///
    /// Zero when the voxel count overflows `usize`: such a volume has no
    /// addressable voxel.
    fn len(&self) -> usize {
        voxel_count(self.dimensions()).unwrap_or(0)
    }

    /// Whether the volume has no voxels at all.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Linear-index strides for x, y and z.
    fn increments(&self) -> [isize; 3] {
        let [nx, ny, _] = self.dimensions();
        let stride = |n: usize| isize::try_from(n).unwrap_or(isize::MAX);
        [1, stride(nx), stride(nx.saturating_mul(ny))]
    }

    /// Grid coordinate of a linear index.
    fn voxel_of(&self, index: usize) -> [usize; 3] {
        let [nx, ny, _] = self.dimensions();
        [index % nx, (index / nx) % ny, index / nx.saturating_mul(ny)]
    }

    /// Linear index of a voxel, or `None` outside the volume.
    fn linear_index(&self, voxel: [usize; 3]) -> Option<usize> {
        let [nx, ny, nz] = self.dimensions();
        if voxel[0] >= nx || voxel[1] >= ny || voxel[2] >= nz {
            return None;
        }
        let index = voxel[2]
            .checked_mul(ny)?
            .checked_add(voxel[1])?
            .checked_mul(nx)?
            .checked_add(voxel[0])?;
        (index < self.len()).then_some(index)
    }

    /// World position of a voxel.
    fn position_of(&self, voxel: [usize; 3]) -> [f64; 3] {
        let origin = self.origin();
        let spacing = self.spacing();
        [
            origin[0] + voxel[0] as f64 * spacing[0],
            origin[1] + voxel[1] as f64 * spacing[1],
            origin[2] + voxel[2] as f64 * spacing[2],
        ]
    }
}

/// Scalar value written for voxels outside the skeleton.
pub const OFF_VALUE: f32 = -1.0;

/// Dense in-memory volume.
///
/// Each scalar doubles as membership flag and medial thickness: voxels with a
/// scalar `>= 0` are part of the structure, everything else (the `-1`
/// sentinel, NaN) is background.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseVolume {
    dims: [usize; 3],
    spacing: [f64; 3],
    origin: [f64; 3],
    scalars: Vec<f32>,
}

impl DenseVolume {
    /// Create a volume from an existing scalar buffer with unit spacing.
    pub fn new(dims: [usize; 3], scalars: Vec<f32>) -> Result<Self, VolumeError> {
        Self::with_geometry(dims, [1.0; 3], [0.0; 3], scalars)
    }

    /// Create a volume with explicit spacing and origin.
    pub fn with_geometry(
        dims: [usize; 3],
        spacing: [f64; 3],
        origin: [f64; 3],
        scalars: Vec<f32>,
    ) -> Result<Self, VolumeError> {
        let volume = Self {
            dims,
            spacing,
            origin,
            scalars,
        };
        volume.check()?;
        Ok(volume)
    }

    /// Create a volume with every voxel switched off.
    ///
    /// # Panics
    ///
    /// If the voxel count of `dims` cannot be allocated, as with `vec!`.
    pub fn empty(dims: [usize; 3]) -> Self {
        Self {
            dims,
            spacing: [1.0; 3],
            origin: [0.0; 3],
            scalars: vec![OFF_VALUE; voxel_count(dims).unwrap_or(usize::MAX)],
        }
    }

    /// Check dimensions, buffer size and spacing.
    ///
    /// Deserialized volumes skip the constructors; check them before use.
    pub fn check(&self) -> Result<(), VolumeError> {
        let expected = voxel_count(self.dims).ok_or(VolumeError::TooLarge { dims: self.dims })?;
        if self.scalars.len() != expected {
            return Err(VolumeError::SizeMismatch {
                expected,
                actual: self.scalars.len(),
            });
        }
        if self.spacing.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(VolumeError::InvalidSpacing(self.spacing));
        }
        Ok(())
    }

    /// Re-validate a volume obtained through deserialization.
    pub fn validate(self) -> Result<Self, VolumeError> {
        self.check()?;
        Ok(self)
    }

    /// Linear index of a voxel coordinate.
    pub fn index_of(&self, voxel: [usize; 3]) -> Result<usize, VolumeError> {
        self.linear_index(voxel)
            .filter(|i| *i < self.scalars.len())
            .ok_or(VolumeError::OutOfBounds {
                voxel,
                dims: self.dims,
            })
    }

    /// Switch a voxel on with the given thickness.
    ///
    /// The thickness doubles as the membership flag, so it must be finite
    /// and non-negative.
    pub fn set_on(&mut self, voxel: [usize; 3], thickness: f32) -> Result<(), VolumeError> {
        if !thickness.is_finite() || thickness < 0.0 {
            return Err(VolumeError::InvalidThickness { voxel, thickness });
        }
        let idx = self.index_of(voxel)?;
        self.scalars[idx] = thickness;
        Ok(())
    }

    /// Switch a voxel off.
    pub fn set_off(&mut self, voxel: [usize; 3]) -> Result<(), VolumeError> {
        let idx = self.index_of(voxel)?;
        self.scalars[idx] = OFF_VALUE;
        Ok(())
    }

    /// Raw scalar buffer.
    pub fn scalars(&self) -> &[f32] {
        &self.scalars
    }

    /// Number of voxels that are switched on.
    pub fn count_on(&self) -> usize {
        self.scalars.iter().filter(|s| **s >= 0.0).count()
    }
}

impl VoxelVolume for DenseVolume {
    fn dimensions(&self) -> [usize; 3] {
        self.dims
    }

    fn spacing(&self) -> [f64; 3] {
        self.spacing
    }

    fn origin(&self) -> [f64; 3] {
        self.origin
    }

    fn is_on(&self, index: usize) -> bool {
        // NaN compares false, so it counts as background.
        self.scalars.get(index).is_some_and(|s| *s >= 0.0)
    }

    fn thickness(&self, index: usize) -> f32 {
        self.scalars.get(index).copied().unwrap_or(OFF_VALUE)
    }
}
