//! Direct simulation of a CTIS image from a cube, without building `H`.
//!
//! Without PSF and noise the result equals `H` (from
//! `system_matrix::build_matrix` with the same parameters) applied to the
//! flattened cube: both place their blocks through the same `ForwardModel`.

use ndarray::{s, ArrayView3, Axis};
use rand::rngs::StdRng;
use rand::{thread_rng, Rng, RngCore, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::config::OpticalParameters;
use crate::error::ConfigError;
use crate::optics::ForwardModel;
use crate::types::{Image, Intensity};

/// Simulate the image of `cube` seen through `optics`.
///
/// Sensor noise, if any, is drawn from a generator seeded with
/// `optics.noise_seed`, or from fresh entropy when no seed is given.
pub fn simulate(cube: ArrayView3<Intensity>, optics: &OpticalParameters) -> Result<Image, ConfigError> {
    let seed = optics.noise_seed.unwrap_or_else(|| thread_rng().next_u64());
    let mut rng = StdRng::seed_from_u64(seed);
    simulate_with_rng(cube, optics, &mut rng)
}

/// As `simulate`, drawing sensor noise from `rng`.
pub fn simulate_with_rng<R: Rng + ?Sized>(
    cube  : ArrayView3<Intensity>,
    optics: &OpticalParameters,
    rng   : &mut R,
) -> Result<Image, ConfigError> {
    let (nx, ny, nz) = cube.dim();
    let model = ForwardModel::new([nx, ny, nz], optics)?;
    let noise = optics.checked_noise_std()?;

    let [gx, gy] = model.canvas_size();
    let mut canvas = Image::zeros((gx, gy));
    for (band, k) in model.geometry().band_steps() {
        let slice = cube.index_axis(Axis(2), band);
        for ([row, col], factor) in model.placements(band, k) {
            canvas.slice_mut(s![row..row + nx, col..col + ny])
                .scaled_add(factor, &slice);
        }
    }

    if let Some(psf) = model.psf() {
        canvas = psf.blur(&canvas);
    }

    if let Some(std) = noise {
        add_sensor_noise(&mut canvas, std, rng)?;
    }
    Ok(canvas)
}

/// Add zero-mean Gaussian noise to every pixel, then clip at zero: the
/// detector cannot report negative counts.
fn add_sensor_noise<R: Rng + ?Sized>(image: &mut Image, std: Intensity, rng: &mut R) -> Result<(), ConfigError> {
    if std == 0.0 { return Ok(()) }
    let normal = Normal::new(0.0, std).map_err(|_| ConfigError::InvalidNoiseStd(std))?;
    image.mapv_inplace(|v| (v + normal.sample(rng)).max(0.0));
    Ok(())
}


#[cfg(test)]
mod test {
    use super::*;
    use float_eq::assert_float_eq;
    use ndarray::Array3;
    #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};

    #[test]
    fn blocks_land_at_order_anchors() {
        let cube = Array3::from_shape_fn((2, 3, 1), |(i, j, _)| (1 + i + 2 * j) as Intensity);
        let image = simulate(cube.view(), &OpticalParameters::default()).unwrap();
        let model = ForwardModel::new([2, 3, 1], &OpticalParameters::default()).unwrap();
        let mut covered = 0;
        for ([r, c], _) in model.placements(0, 1) {
            assert_eq!(image.slice(s![r..r + 2, c..c + 3]), cube.index_axis(Axis(2), 0));
            covered += 6;
        }
        assert_eq!(image.iter().filter(|&&v| v != 0.0).count(), covered);
    }

    #[test]
    fn noise_is_reproducible_and_non_negative() {
        let cube = Array3::from_elem((4, 4, 3), 0.2);
        let optics = OpticalParameters { noise_std: Some(0.5), noise_seed: Some(7), ..Default::default() };
        let a = simulate(cube.view(), &optics).unwrap();
        let b = simulate(cube.view(), &optics).unwrap();
        assert_eq!(a, b);
        assert!(a.iter().all(|&v| v >= 0.0));
        let clean = simulate(cube.view(), &OpticalParameters::default()).unwrap();
        assert_ne!(a, clean);
    }

    #[test]
    fn zero_noise_leaves_image_untouched() {
        let cube = Array3::from_elem((3, 3, 2), 1.0);
        let optics = OpticalParameters { noise_std: Some(0.0), ..Default::default() };
        let noisy = simulate(cube.view(), &optics).unwrap();
        let clean = simulate(cube.view(), &OpticalParameters::default()).unwrap();
        assert_eq!(noisy, clean);
    }

    #[test]
    fn illumination_scales_bands() {
        let cube = Array3::from_elem((2, 2, 2), 1.0);
        let optics = OpticalParameters { illum: Some(ndarray::array![2.0, 0.0]), ..Default::default() };
        let image = simulate(cube.view(), &optics).unwrap();
        assert_float_eq!(image.sum(), 2.0 * 4.0 * 5.0, abs <= 1e-12);
    }

    #[rstest::rstest(/**/ std,
                     case(-1.0),
                     case(f64::NAN),
    )]
    fn unusable_noise_std_is_reported(std: Intensity) {
        let mut image = Image::from_elem((3, 3), 1.0);
        let mut rng = StdRng::seed_from_u64(1);
        let err = add_sensor_noise(&mut image, std, &mut rng).unwrap_err();
        assert_eq!(format!("{err:?}"), format!("{:?}", ConfigError::InvalidNoiseStd(std)));
        assert_eq!(image, Image::from_elem((3, 3), 1.0));
    }

    #[test]
    fn bad_parameters_are_rejected() {
        let cube = Array3::from_elem((2, 2, 2), 1.0);
        let optics = OpticalParameters { illum: Some(ndarray::array![1.0]), ..Default::default() };
        assert_eq!(simulate(cube.view(), &optics).unwrap_err(),
                   ConfigError::IlluminationLength { bands: 2, got: 1 });
        let optics = OpticalParameters { noise_std: Some(f64::INFINITY), ..Default::default() };
        assert!(simulate(cube.view(), &optics).is_err());
    }
}
