//! Synthetic hyperspectral scenes, for exercising the forward model and the
//! reconstruction without calibration data.

use ndarray::Array3;
use serde::Deserialize;

use crate::types::{Cube, CubeDim, Intensity, Pixels};

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Phantom {
    /// The same value in every voxel
    Uniform { value: Intensity },
    /// A sum of Gaussian spots, each emitting a Gaussian spectral line
    Spots { spots: Vec<Spot> },
}

impl Default for Phantom {
    fn default() -> Self { Self::Uniform { value: 1.0 } }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Spot {
    /// Position, in (row, column) voxels
    pub centre: (Pixels, Pixels),
    /// Spatial standard deviation, in voxels
    pub width: Pixels,
    /// Band at which the spectral line peaks
    pub peak_band: Pixels,
    /// Spectral standard deviation, in bands
    pub bandwidth: Pixels,
    pub amplitude: Intensity,
}

impl Spot {
    fn value(&self, i: usize, j: usize, b: usize) -> Intensity {
        let gauss = |d: Pixels, s: Pixels| (-0.5 * (d / s) * (d / s)).exp();
        let (ci, cj) = self.centre;
        self.amplitude
            * gauss(i as Pixels - ci, self.width)
            * gauss(j as Pixels - cj, self.width)
            * gauss(b as Pixels - self.peak_band, self.bandwidth)
    }
}

impl Phantom {
    pub fn cube(&self, [nx, ny, nz]: CubeDim) -> Cube {
        match self {
            Self::Uniform { value } => Array3::from_elem((nx, ny, nz), *value),
            Self::Spots { spots } => Array3::from_shape_fn((nx, ny, nz), |(i, j, b)| {
                spots.iter().map(|spot| spot.value(i, j, b)).sum()
            }),
        }
    }
}
