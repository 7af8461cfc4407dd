//! Isotropic Gaussian point spread function.
//!
//! The kernel is truncated at `TRUNCATE` standard deviations and normalized to
//! unit sum. Pixels outside the canvas are treated as zero, so energy blurred
//! past the edge of the detector is lost.

use ndarray::{Array2, Zip};

use crate::error::ConfigError;
use crate::index::pixel_to_1;
use crate::types::{CanvasDim, Index1, Index2, Intensity, Pixels};

/// Kernel half-width, in units of sigma
pub const TRUNCATE: Pixels = 4.0;

/// Widest kernel half-width, in pixels
pub const MAX_RADIUS: usize = 1024;

#[derive(Clone, Debug)]
pub struct GaussianPsf {
    sigma: Pixels,
    radius: usize,
    kernel: Array2<Intensity>,
}

impl GaussianPsf {

    /// Kernel truncated at `TRUNCATE` sigmas. Kernels wider than
    /// `MAX_RADIUS` pixels are rejected.
    pub fn new(sigma: Pixels) -> Result<Self, ConfigError> {
        if sigma.is_finite() && natural_radius(sigma) > MAX_RADIUS {
            return Err(ConfigError::PsfTooWide { sigma, max_radius: MAX_RADIUS })
        }
        Self::clamped(sigma, MAX_RADIUS)
    }

    /// Kernel truncated at `TRUNCATE` sigmas or at the extent of `canvas`,
    /// whichever is narrower: kernel entries further away than that can never
    /// land on the canvas. The kernel is normalized over the retained support.
    pub fn for_canvas(sigma: Pixels, [rows, cols]: CanvasDim) -> Result<Self, ConfigError> {
        Self::clamped(sigma, rows.max(cols).saturating_sub(1).min(MAX_RADIUS))
    }

    /// Build from an optional sigma, sized for `canvas`: `None` means no blur
    /// at all.
    pub fn from_option(sigma: Option<Pixels>, canvas: CanvasDim) -> Result<Option<Self>, ConfigError> {
        sigma.map(|sigma| Self::for_canvas(sigma, canvas)).transpose()
    }

    fn clamped(sigma: Pixels, max_radius: usize) -> Result<Self, ConfigError> {
        if !(sigma.is_finite() && sigma > 0.0) {
            return Err(ConfigError::InvalidPsfSigma(sigma))
        }
        let radius = natural_radius(sigma).min(max_radius);
        Ok(Self { sigma, radius, kernel: make_kernel(sigma, radius) })
    }

    pub fn sigma (&self) -> Pixels            { self.sigma }
    pub fn radius(&self) -> usize             { self.radius }
    pub fn kernel(&self) -> &Array2<Intensity> { &self.kernel }

    /// Convolve the whole canvas with the kernel, in parallel over output
    /// pixels.
    pub fn blur(&self, canvas: &Array2<Intensity>) -> Array2<Intensity> {
        let (rows, cols) = canvas.dim();
        let r = self.radius as isize;
        let mut out = Array2::zeros((rows, cols));
        Zip::indexed(&mut out).par_for_each(|(i, j), out| {
            let mut sum = 0.0;
            for ((ki, kj), &k) in self.kernel.indexed_iter() {
                let ii = i as isize + ki as isize - r;
                let jj = j as isize + kj as isize - r;
                if ii >= 0 && jj >= 0 && (ii as usize) < rows && (jj as usize) < cols {
                    sum += k * canvas[[ii as usize, jj as usize]];
                }
            }
            *out = sum;
        });
        out
    }

    /// The blurred image of a single impulse of `weight` at `pixel`, clipped to
    /// the canvas and appended to `out` as `(flat pixel index, value)` pairs.
    ///
    /// Because the kernel is symmetric, stamping every impulse of a canvas and
    /// summing gives exactly what `blur` gives for that canvas.
    pub fn stamp(&self, [row, col]: Index2, weight: Intensity, canvas: CanvasDim, out: &mut Vec<(Index1, Intensity)>) {
        let [rows, cols] = canvas;
        let r = self.radius as isize;
        for ((ki, kj), &k) in self.kernel.indexed_iter() {
            let ii = row as isize + ki as isize - r;
            let jj = col as isize + kj as isize - r;
            if ii >= 0 && jj >= 0 && (ii as usize) < rows && (jj as usize) < cols {
                out.push((pixel_to_1([ii as usize, jj as usize], canvas), weight * k));
            }
        }
    }
}

// Saturates for absurd sigmas; callers clamp it.
fn natural_radius(sigma: Pixels) -> usize {
    (TRUNCATE * sigma + 0.5) as usize
}

fn make_kernel(sigma: Pixels, radius: usize) -> Array2<Intensity> {
    let size = 2 * radius + 1;
    let two_sigma_squared = 2.0 * sigma * sigma;
    let mut kernel = Array2::from_shape_fn((size, size), |(i, j)| {
        let x = i as Pixels - radius as Pixels;
        let y = j as Pixels - radius as Pixels;
        (-(x * x + y * y) / two_sigma_squared).exp()
    });
    let sum = kernel.sum();
    kernel.mapv_inplace(|k| k / sum);
    kernel
}


#[cfg(test)]
mod test {
    use super::*;
    use float_eq::assert_float_eq;
    use rstest::rstest;
    #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};

    #[rstest(/**/ sigma, radius,
             case(0.1 , 0),
             case(0.5 , 2),
             case(1.0 , 4),
             case(2.3 , 9),
    )]
    fn kernel_is_normalized_and_symmetric(sigma: Pixels, radius: usize) {
        let psf = GaussianPsf::new(sigma).unwrap();
        assert_eq!(psf.radius(), radius);
        let k = psf.kernel();
        assert_float_eq!(k.sum(), 1.0, abs <= 1e-12);
        let n = k.nrows();
        for ((i, j), &v) in k.indexed_iter() {
            assert_eq!(v, k[[n - 1 - i, n - 1 - j]]);
            assert_eq!(v, k[[j, i]]);
        }
    }

    #[rstest(/**/ sigma,
             case(0.0),
             case(-1.0),
             case(f64::NAN),
             case(f64::INFINITY),
    )]
    fn bad_sigma_is_rejected(sigma: Pixels) {
        assert!(GaussianPsf::new(sigma).is_err());
    }

    #[test]
    fn stamps_agree_with_blur() {
        let psf = GaussianPsf::new(0.8).unwrap();
        let dim = [9, 7];
        let impulses = [([0, 0], 2.0), ([4, 3], 1.0), ([8, 6], 0.5), ([4, 4], 3.0)];

        let mut canvas = Array2::zeros((9, 7));
        let mut stamped = Array2::zeros((9, 7));
        let mut entries = vec![];
        for (pixel, weight) in impulses {
            canvas[pixel] += weight;
            psf.stamp(pixel, weight, dim, &mut entries);
        }
        for (i, v) in entries {
            stamped[crate::index::pixel_from_1(i, dim)] += v;
        }

        let blurred = psf.blur(&canvas);
        for (a, b) in blurred.iter().zip(stamped.iter()) {
            assert_float_eq!(a, b, abs <= 1e-12);
        }
    }

    #[rstest(/**/ sigma,
             case(300.0),
             case(1e19),
             case(f64::MAX),
    )]
    fn overly_wide_psf_is_rejected_without_panicking(sigma: Pixels) {
        assert_eq!(GaussianPsf::new(sigma).unwrap_err(),
                   ConfigError::PsfTooWide { sigma, max_radius: MAX_RADIUS });
    }

    #[rstest(/**/ sigma, canvas , radius,
             case(0.8 , [9, 7],     3),
             case(3.0 , [9, 7],     8),
             case(1e3 , [9, 7],     8),
             case(1e19, [5, 12],   11),
             case(1e19, [1, 1],     0),
    )]
    fn kernel_is_clamped_to_the_canvas(sigma: Pixels, canvas: CanvasDim, radius: usize) {
        let psf = GaussianPsf::for_canvas(sigma, canvas).unwrap();
        assert_eq!(psf.radius(), radius);
        assert_eq!(psf.kernel().dim(), (2 * radius + 1, 2 * radius + 1));
        assert_float_eq!(psf.kernel().sum(), 1.0, abs <= 1e-12);
    }

    #[test]
    fn clamped_stamps_agree_with_clamped_blur() {
        let dim = [6, 4];
        let psf = GaussianPsf::for_canvas(50.0, dim).unwrap();
        let mut canvas = Array2::zeros((6, 4));
        canvas[[0, 0]] = 1.0;
        canvas[[5, 3]] = 2.0;
        let mut entries = vec![];
        psf.stamp([0, 0], 1.0, dim, &mut entries);
        psf.stamp([5, 3], 2.0, dim, &mut entries);
        let mut stamped = Array2::zeros((6, 4));
        for (i, v) in entries {
            stamped[crate::index::pixel_from_1(i, dim)] += v;
        }
        for (a, b) in psf.blur(&canvas).iter().zip(stamped.iter()) {
            assert_float_eq!(a, b, abs <= 1e-12);
        }
    }

    #[test]
    fn blur_conserves_energy_away_from_edges() {
        let psf = GaussianPsf::new(1.0).unwrap();
        let mut canvas = Array2::zeros((21, 21));
        canvas[[10, 10]] = 5.0;
        canvas[[9, 11]] = 1.5;
        assert_float_eq!(psf.blur(&canvas).sum(), 6.5, abs <= 1e-12);
    }
}
