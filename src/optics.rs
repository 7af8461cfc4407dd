//! The validated optical model of one instrument configuration, shared by the
//! system matrix builder and the forward simulator.

use ndarray::Array2;

use crate::config::OpticalParameters;
use crate::error::ConfigError;
use crate::gauss::GaussianPsf;
use crate::geometry::CanvasGeometry;
use crate::types::{CanvasDim, CubeDim, Index2, Intensity};

#[derive(Clone, Debug)]
pub struct ForwardModel {
    geometry: CanvasGeometry,
    /// `illum[band] * diff_sens[order, band]`, indexed by `[order, band]`
    factors: Array2<Intensity>,
    psf: Option<GaussianPsf>,
}

impl ForwardModel {

    /// Check every parameter against the cube dimensions. Nothing is computed
    /// from an inconsistent configuration.
    pub fn new(n: CubeDim, optics: &OpticalParameters) -> Result<Self, ConfigError> {
        let geometry = CanvasGeometry::new(n, optics.b1, optics.b2, optics.shift, optics.layout())?;
        let bands = n[2];
        let diff_sens = optics.diff_sens_for(bands)?;
        let illum     = optics.illum_for(bands)?;
        let psf = GaussianPsf::from_option(optics.sigma_psf, geometry.canvas_size())?;
        optics.checked_noise_std()?;
        let factors = &diff_sens * &illum;
        log::debug!("CTIS canvas {:?} for cube {:?}, {} orders, PSF {:?}",
                    geometry.canvas_size(), n, geometry.layout().n_orders(),
                    psf.as_ref().map(GaussianPsf::sigma));
        Ok(Self { geometry, factors, psf })
    }

    pub fn geometry   (&self) -> &CanvasGeometry     { &self.geometry }
    pub fn psf        (&self) -> Option<&GaussianPsf> { self.psf.as_ref() }
    pub fn cube_dims  (&self) -> CubeDim             { self.geometry.cube_dims() }
    pub fn canvas_size(&self) -> CanvasDim           { self.geometry.canvas_size() }

    /// Top-left anchor and energy factor of every diffraction order of `band`,
    /// whose dispersion step is `k`.
    pub fn placements(&self, band: usize, k: usize) -> impl Iterator<Item = (Index2, Intensity)> + '_ {
        self.geometry.anchors(k)
            .map(move |(order, anchor)| (anchor, self.factors[[order.index(), band]]))
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use ndarray::{array, Array1};
    #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};

    #[test]
    fn factors_combine_illumination_and_sensitivity() {
        let optics = OpticalParameters {
            illum: Some(array![2.0, 3.0]),
            diff_sens: Some(Array2::from_shape_fn((5, 2), |(o, b)| (o + 1) as f64 * 0.1 + b as f64)),
            ..Default::default()
        };
        let model = ForwardModel::new([2, 2, 2], &optics).unwrap();
        let (band, k) = model.geometry().band_steps().nth(1).unwrap();
        let factors: Array1<f64> = model.placements(band, k).map(|(_, f)| f).collect();
        let expected = array![1.1, 1.2, 1.3, 1.4, 1.5] * 3.0;
        for (a, e) in factors.iter().zip(expected.iter()) {
            float_eq::assert_float_eq!(a, e, abs <= 1e-12);
        }
    }

    #[test]
    fn psf_kernel_never_outgrows_the_canvas() {
        let optics = OpticalParameters { sigma_psf: Some(1e19), ..Default::default() };
        let model = ForwardModel::new([2, 3, 1], &optics).unwrap();
        let [gx, gy] = model.canvas_size();
        assert_eq!(model.psf().map(GaussianPsf::radius), Some(gx.max(gy) - 1));
    }

    #[test]
    fn every_check_happens_up_front() {
        let bad_psf   = OpticalParameters { sigma_psf: Some(-1.0), ..Default::default() };
        let bad_noise = OpticalParameters { noise_std: Some(-1.0), ..Default::default() };
        let bad_shift = OpticalParameters { shift: 0, ..Default::default() };
        assert_eq!(ForwardModel::new([2, 2, 2], &bad_psf  ).unwrap_err(), ConfigError::InvalidPsfSigma(-1.0));
        assert_eq!(ForwardModel::new([2, 2, 2], &bad_noise).unwrap_err(), ConfigError::InvalidNoiseStd(-1.0));
        assert_eq!(ForwardModel::new([2, 2, 2], &bad_shift).unwrap_err(), ConfigError::ZeroShift(0));
        assert_eq!(ForwardModel::new([2, 0, 2], &OpticalParameters::default()).unwrap_err(),
                   ConfigError::EmptyDimension { name: "y", value: 0 });
    }
}
