//! Optical parameters and the run configuration file.
//!
//! `OpticalParameters` is what the library operations consume. `Config` is the
//! TOML file read by the `ctis` binary; its `[optics]` section converts into
//! `OpticalParameters`.

use std::fs;
use std::path::Path;

use ndarray::{Array1, Array2};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::geometry::OrderLayout;
use crate::mlem::Initialization;
use crate::phantom::Phantom;
use crate::types::{Intensity, Pixels};

/// Everything about the instrument except the size of the cube.
///
/// Calibration arrays left as `None` default to all ones, sized to match the
/// cube they are used with.
#[derive(Clone, Debug, PartialEq)]
pub struct OpticalParameters {
    /// Gap between the zeroth order and the first-order arms
    pub b1: usize,
    /// Outer border of the canvas
    pub b2: usize,
    /// Dispersion step per spectral band, in pixels
    pub shift: usize,
    /// Nine diffraction orders rather than five
    pub all_orders: bool,
    /// Diffraction efficiency of each order in each band: `orders × z`
    pub diff_sens: Option<Array2<Intensity>>,
    /// Illumination spectrum: `z`
    pub illum: Option<Array1<Intensity>>,
    /// Standard deviation of the PSF blur; no blur when absent
    pub sigma_psf: Option<Pixels>,
    /// Standard deviation of additive sensor noise; noiseless when absent
    pub noise_std: Option<Intensity>,
    /// Seed for the sensor noise; fresh entropy when absent
    pub noise_seed: Option<u64>,
}

impl Default for OpticalParameters {
    fn default() -> Self {
        Self {
            b1: 1,
            b2: 0,
            shift: 1,
            all_orders: false,
            diff_sens: None,
            illum: None,
            sigma_psf: None,
            noise_std: None,
            noise_seed: None,
        }
    }
}

impl OpticalParameters {

    pub fn layout(&self) -> OrderLayout { OrderLayout::from_all_orders(self.all_orders) }

    /// The diffraction sensitivity to use with a cube of `bands` bands,
    /// checked against the order layout.
    pub fn diff_sens_for(&self, bands: usize) -> Result<Array2<Intensity>, ConfigError> {
        let expected = self.layout().n_orders();
        match &self.diff_sens {
            None => Ok(Array2::ones((expected, bands))),
            Some(sens) => {
                let (rows, cols) = sens.dim();
                if rows != expected {
                    return Err(ConfigError::SensitivityRows { expected, got: rows })
                }
                if cols != bands {
                    return Err(ConfigError::SensitivityColumns { bands, got: cols })
                }
                Ok(sens.clone())
            }
        }
    }

    /// The illumination spectrum to use with a cube of `bands` bands.
    pub fn illum_for(&self, bands: usize) -> Result<Array1<Intensity>, ConfigError> {
        match &self.illum {
            None => Ok(Array1::ones(bands)),
            Some(illum) if illum.len() == bands => Ok(illum.clone()),
            Some(illum) => Err(ConfigError::IlluminationLength { bands, got: illum.len() }),
        }
    }

    pub fn checked_noise_std(&self) -> Result<Option<Intensity>, ConfigError> {
        match self.noise_std {
            Some(std) if !(std.is_finite() && std >= 0.0) => Err(ConfigError::InvalidNoiseStd(std)),
            other => Ok(other),
        }
    }
}

// ------------------------------ Configuration file ------------------------------

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct Config {

    /// Number of EM iterations to perform
    #[serde(default = "default_iterations")]
    pub iterations: usize,

    /// Starting point of the EM iterations
    #[serde(default)]
    pub initialization: Initialization,

    pub cube: CubeConfig,

    #[serde(default)]
    pub optics: OpticsConfig,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct CubeConfig {
    /// Spatial rows, spatial columns, spectral bands
    pub nvoxels: (usize, usize, usize),

    /// Synthetic scene, used when no cube file is given
    #[serde(default)]
    pub phantom: Phantom,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct OpticsConfig {
    pub b1: Option<usize>,
    pub b2: Option<usize>,
    pub shift: Option<usize>,
    #[serde(default)]
    pub all_orders: bool,
    pub illumination: Option<Vec<Intensity>>,
    /// One row per diffraction order
    pub sensitivity: Option<Vec<Vec<Intensity>>>,
    pub sigma_psf: Option<Pixels>,
    pub noise_std: Option<Intensity>,
    pub noise_seed: Option<u64>,
}

impl OpticsConfig {

    pub fn parameters(&self) -> Result<OpticalParameters, ConfigError> {
        let defaults = OpticalParameters::default();
        Ok(OpticalParameters {
            b1   : self.b1   .unwrap_or(defaults.b1),
            b2   : self.b2   .unwrap_or(defaults.b2),
            shift: self.shift.unwrap_or(defaults.shift),
            all_orders: self.all_orders,
            diff_sens : self.sensitivity.as_deref().map(rows_to_array).transpose()?,
            illum     : self.illumination.clone().map(Array1::from),
            sigma_psf : self.sigma_psf,
            noise_std : self.noise_std,
            noise_seed: self.noise_seed,
        })
    }
}

fn rows_to_array(rows: &[Vec<Intensity>]) -> Result<Array2<Intensity>, ConfigError> {
    let ncols = rows.first().map_or(0, Vec::len);
    for (row, values) in rows.iter().enumerate() {
        if values.len() != ncols {
            return Err(ConfigError::RaggedSensitivity { row, expected: ncols, got: values.len() })
        }
    }
    Ok(Array2::from_shape_fn((rows.len(), ncols), |(i, j)| rows[i][j]))
}

fn default_iterations() -> usize { 20 }

pub fn read_config_file(path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    let config = fs::read_to_string(path)
        .map_err(|e| format!("Couldn't read config file `{}`: {e}", path.display()))?;
    Ok(toml::from_str(&config)?)
}
