//! Forward model and reconstruction for a computed tomography imaging
//! spectrometer (CTIS).
//!
//! + `system_matrix::build_matrix` builds the sparse operator `H` mapping a
//!   flattened hyperspectral cube onto a flattened CTIS image.
//!
//! + `simulate::simulate` applies the same optical model directly to a cube,
//!   with optional PSF blur and sensor noise.
//!
//! + `mlem::reconstruct` inverts `g = H f` by multiplicative EM iterations.

pub mod types;
pub use types::*;

pub mod error;
pub mod index;
pub mod geometry;
pub mod gauss;
pub mod config;
pub mod optics;
pub mod projector;
pub mod system_matrix;
pub mod simulate;
pub mod mlem;
pub mod phantom;
pub mod fom;
pub mod io;
pub mod utils;

pub use config::OpticalParameters;
pub use error::ConfigError;
pub use mlem::{reconstruct, reconstruct_cube, Initialization, Mlem};
pub use projector::Projector;
pub use simulate::simulate;
pub use system_matrix::{build_matrix, SystemMatrix};
