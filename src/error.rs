//! Rejection of inconsistent configurations.
//!
//! Every check happens before any computation starts: a `ConfigError` means no
//! matrix, image or cube was produced.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("cube dimension `{name}` must be at least 1, got {value}")]
    EmptyDimension { name: &'static str, value: usize },

    #[error("dispersion shift must be at least 1, got {0}")]
    ZeroShift(usize),

    #[error("diffraction sensitivity has {got} rows, but the {expected}-order layout needs one row per order")]
    SensitivityRows { expected: usize, got: usize },

    #[error("diffraction sensitivity has {got} columns, but the cube has {bands} bands")]
    SensitivityColumns { bands: usize, got: usize },

    #[error("diffraction sensitivity row {row} has {got} entries, but row 0 has {expected}")]
    RaggedSensitivity { row: usize, expected: usize, got: usize },

    #[error("illumination has {got} entries, but the cube has {bands} bands")]
    IlluminationLength { bands: usize, got: usize },

    #[error("PSF standard deviation must be positive and finite, got {0}")]
    InvalidPsfSigma(f64),

    #[error("PSF standard deviation {sigma} needs a kernel wider than {max_radius} pixels")]
    PsfTooWide { sigma: f64, max_radius: usize },

    #[error("noise standard deviation must be non-negative and finite, got {0}")]
    InvalidNoiseStd(f64),

    #[error("{what} vector should have {expected} elements, got {got}")]
    VectorLength { what: &'static str, expected: usize, got: usize },
}
