//! Multiplicative expectation-maximization (Richardson-Lucy) inversion of
//! `g = H f`.
//!
//! Each iteration performs
//!
//! ```text
//! ratio      = guard(g / (H f))
//! normalized = guard(f / hsum)
//! f          = normalized * (Hᵗ ratio)
//! ```
//!
//! where `hsum = Hᵗ 1` is computed once and `guard` replaces NaN and ±∞ with
//! zero. All products are elementwise. With `H, g ≥ 0` every factor is
//! non-negative, so the estimate stays non-negative. There is no convergence
//! test: the caller chooses the number of iterations.

use ndarray::{Array1, ArrayView2, Zip};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::index::vectorize_image;
use crate::projector::Projector;
use crate::system_matrix::SystemMatrix;
use crate::types::{Cube, CubeVector, ImageVector, Intensity};

/// Starting point of the iterations
#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Initialization {
    /// `f₀ = Hᵗ g`
    #[default]
    BackProjection,
    /// `f₀ = 1`
    Uniform,
}

/// Zero instead of the results of dividing by zero.
#[inline]
pub fn finite_or_zero(x: Intensity) -> Intensity {
    if x.is_finite() { x } else { 0.0 }
}

/// State of an EM reconstruction.
///
/// As an `Iterator` it yields the estimate after each successive iteration,
/// without end.
pub struct Mlem<'h, P: ?Sized> {
    projector  : &'h P,
    measured   : ImageVector,
    sensitivity: CubeVector,
    estimate   : CubeVector,
    iteration  : usize,
}

impl<'h, P: Projector + ?Sized> Mlem<'h, P> {

    /// Prepare to reconstruct from the image `g`, which is flattened in the
    /// same pixel order as the rows of `projector`.
    pub fn new(projector: &'h P, g: ArrayView2<Intensity>, initialization: Initialization) -> Result<Self, ConfigError> {
        Self::from_vector(projector, vectorize_image(g), initialization)
    }

    /// Prepare to reconstruct from an already flattened image.
    pub fn from_vector(projector: &'h P, measured: ImageVector, initialization: Initialization) -> Result<Self, ConfigError> {
        let expected = projector.n_pixels();
        if measured.len() != expected {
            return Err(ConfigError::VectorLength { what: "image", expected, got: measured.len() })
        }
        let estimate = match initialization {
            Initialization::BackProjection => projector.back_project(measured.view()),
            Initialization::Uniform        => Array1::ones(projector.n_voxels()),
        };
        let sensitivity = projector.sensitivity();
        Ok(Self { projector, measured, sensitivity, estimate, iteration: 0 })
    }

    pub fn estimate (&self) -> &CubeVector { &self.estimate }
    pub fn iteration(&self) -> usize       { self.iteration }

    pub fn into_estimate(self) -> CubeVector { self.estimate }

    /// Advance the estimate by one EM update.
    pub fn one_iteration(&mut self) {
        // -------- Forward projection of the current estimate --------------------
        let mut ratio = self.projector.forward_project(self.estimate.view());

        // -------- Compare with the measurement ----------------------------------
        Zip::from(&mut ratio).and(&self.measured).for_each(|r, &g| {
            *r = finite_or_zero(g / *r);
        });

        // -------- Normalize by the voxel sensitivities --------------------------
        Zip::from(&mut self.estimate).and(&self.sensitivity).for_each(|f, &s| {
            *f = finite_or_zero(*f / s);
        });

        // -------- Backproject the correction ------------------------------------
        let correction = self.projector.back_project(ratio.view());
        self.estimate *= &correction;
        self.iteration += 1;
    }

    /// Run `iterations` updates and return the final estimate.
    pub fn run(mut self, iterations: usize) -> CubeVector {
        for _ in 0..iterations { self.one_iteration() }
        log::debug!("EM finished after {} iterations", self.iteration);
        self.estimate
    }
}

impl<'h, P: Projector + ?Sized> Iterator for Mlem<'h, P> {
    type Item = CubeVector;
    fn next(&mut self) -> Option<Self::Item> {
        self.one_iteration();
        Some(self.estimate.clone())
    }
}

/// Reconstruct the flattened cube observed as image `g` through `h`, using
/// `iterations` EM updates starting from the backprojection of `g`.
pub fn reconstruct<P: Projector + ?Sized>(h: &P, g: ArrayView2<Intensity>, iterations: usize) -> Result<CubeVector, ConfigError> {
    Ok(Mlem::new(h, g, Initialization::BackProjection)?.run(iterations))
}

/// As `reconstruct`, reshaped into the `(x, y, z)` cube that `h` was built for.
pub fn reconstruct_cube(h: &SystemMatrix, g: ArrayView2<Intensity>, iterations: usize) -> Result<Cube, ConfigError> {
    h.to_cube(reconstruct(h, g, iterations)?)
}
