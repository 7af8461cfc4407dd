//! Construction of the CTIS system matrix `H`.
//!
//! Column `v` of `H` is the image produced by a unit of energy in voxel `v` of
//! the flattened cube (see `crate::index` for the flattening order): one entry
//! per diffraction order, weighted by the illumination and the order's
//! diffraction efficiency in that band, or, with a PSF, the blurred images of
//! those entries.
//!
//! Columns are independent, so they are computed in parallel, collected in
//! voxel order into a triplet list and compressed once at the end. Duplicate
//! triplets (overlapping PSF footprints of neighbouring orders) are summed by
//! the compression.
//!
//! Memory grows as `orders · x · y · z` entries without a PSF, and as
//! `orders · (2r + 1)² · x · y · z` with a PSF of kernel radius `r`, which is
//! bounded by the fully dense `Gx · Gy · x · y · z`.

use indicatif::ProgressBar;
use ndarray::ArrayView1;
use rayon::prelude::*;
use sprs::{CsMat, TriMat};

use crate::config::OpticalParameters;
use crate::error::ConfigError;
use crate::index::{index1_to_3, pixel_to_1, unvectorize_cube, voxel_count};
use crate::optics::ForwardModel;
use crate::projector::Projector;
use crate::types::{CanvasDim, Cube, CubeDim, CubeVector, ImageVector, Index1, Intensity};

/// The sparse forward operator together with the shapes of the cube and image
/// it maps between.
#[derive(Clone, Debug)]
pub struct SystemMatrix {
    matrix: CsMat<Intensity>,
    cube: CubeDim,
    canvas: CanvasDim,
}

impl SystemMatrix {
    pub fn matrix     (&self) -> &CsMat<Intensity> { &self.matrix }
    pub fn cube_dims  (&self) -> CubeDim            { self.cube }
    pub fn canvas_size(&self) -> CanvasDim          { self.canvas }
    pub fn nnz        (&self) -> usize              { self.matrix.nnz() }

    /// Entries of the column belonging to voxel `voxel`, as `(pixel, value)`.
    pub fn column(&self, voxel: Index1) -> Vec<(Index1, Intensity)> {
        self.matrix.outer_view(voxel)
            .map(|col| col.iter().map(|(pixel, &value)| (pixel, value)).collect())
            .unwrap_or_default()
    }

    /// Reshape a flattened cube estimate into this matrix's cube dimensions.
    pub fn to_cube(&self, data: CubeVector) -> Result<Cube, ConfigError> {
        unvectorize_cube(data, self.cube)
    }
}

impl Projector for SystemMatrix {
    fn n_pixels(&self) -> usize { self.matrix.rows() }
    fn n_voxels(&self) -> usize { self.matrix.cols() }
    fn forward_project(&self, cube : ArrayView1<Intensity>) -> ImageVector { self.matrix.forward_project(cube) }
    fn back_project   (&self, image: ArrayView1<Intensity>) -> CubeVector  { self.matrix.back_project(image) }
}

/// Build `H` for a cube of dimensions `n` observed through `optics`.
pub fn build_matrix(n: CubeDim, optics: &OpticalParameters) -> Result<SystemMatrix, ConfigError> {
    build_matrix_with_progress(n, optics, &ProgressBar::hidden())
}

/// As `build_matrix`, advancing `progress` by one for every finished column.
pub fn build_matrix_with_progress(
    n       : CubeDim,
    optics  : &OpticalParameters,
    progress: &ProgressBar,
) -> Result<SystemMatrix, ConfigError> {
    let model = ForwardModel::new(n, optics)?;
    let canvas = model.canvas_size();
    let [gx, gy] = canvas;
    let n_voxels = voxel_count(n);
    progress.set_length(n_voxels as u64);

    // The dispersion step of each band, as generated by the band loop
    let steps: Vec<usize> = model.geometry().band_steps().map(|(_band, k)| k).collect();

    let columns: Vec<Vec<(Index1, Intensity)>> = (0..n_voxels)
        .into_par_iter()
        .map(|voxel| {
            let column = column_entries(&model, &steps, voxel);
            progress.inc(1);
            column
        })
        .collect();
    progress.finish();

    let nnz = columns.iter().map(Vec::len).sum();
    let mut triplets = TriMat::with_capacity((gx * gy, n_voxels), nnz);
    for (voxel, column) in columns.into_iter().enumerate() {
        for (pixel, value) in column {
            triplets.add_triplet(pixel, voxel, value);
        }
    }
    let matrix: CsMat<Intensity> = triplets.to_csc();
    log::info!("Built {} x {} system matrix with {} non-zeros",
               matrix.rows(), matrix.cols(), matrix.nnz());
    Ok(SystemMatrix { matrix, cube: n, canvas })
}

/// Image of a unit of energy in `voxel`, as `(flat pixel index, value)` pairs.
fn column_entries(model: &ForwardModel, steps: &[usize], voxel: Index1) -> Vec<(Index1, Intensity)> {
    let [i, j, band] = index1_to_3(voxel, model.cube_dims());
    let k = steps[band];
    let canvas = model.canvas_size();
    let mut entries = vec![];
    for ([row, col], factor) in model.placements(band, k) {
        if factor == 0.0 { continue }
        let pixel = [row + i, col + j];
        match model.psf() {
            None      => entries.push((pixel_to_1(pixel, canvas), factor)),
            Some(psf) => psf.stamp(pixel, factor, canvas, &mut entries),
        }
    }
    entries
}
