//! Forward and backward projection through a sparse system matrix.
//!
//! The EM reconstruction only ever needs `H f` and `Hᵗ g`, so it is written
//! against the `Projector` trait rather than a concrete matrix type. Both
//! products are computed without forming `Hᵗ`: for compressed-column storage
//! the forward projection scatters each column into the image and the
//! backprojection gathers each column's dot product with the image; for
//! compressed-row storage the roles are swapped.
//!
//! Gathers are independent per compressed vector and run as a parallel map.
//! Scatters write into a shared output, so each rayon job accumulates into its
//! own buffer and the buffers are summed at the end.

use ndarray::{Array1, ArrayView1};
use rayon::prelude::*;
use sprs::CsMat;

use crate::types::{CubeVector, ImageVector, Intensity};

pub trait Projector {

    /// Number of rows of `H`: pixels in the flattened image
    fn n_pixels(&self) -> usize;

    /// Number of columns of `H`: voxels in the flattened cube
    fn n_voxels(&self) -> usize;

    /// `H f`
    fn forward_project(&self, cube: ArrayView1<Intensity>) -> ImageVector;

    /// `Hᵗ g`
    fn back_project(&self, image: ArrayView1<Intensity>) -> CubeVector;

    /// Total detector response of each voxel: the column sums of `H`.
    fn sensitivity(&self) -> CubeVector {
        self.back_project(Array1::ones(self.n_pixels()).view())
    }
}

impl Projector for CsMat<Intensity> {

    fn n_pixels(&self) -> usize { self.rows() }
    fn n_voxels(&self) -> usize { self.cols() }

    fn forward_project(&self, cube: ArrayView1<Intensity>) -> ImageVector {
        if self.is_csc() { scatter(self, cube, self.rows()) }
        else             { gather (self, cube)              }
    }

    fn back_project(&self, image: ArrayView1<Intensity>) -> CubeVector {
        if self.is_csc() { gather (self, image)              }
        else             { scatter(self, image, self.cols()) }
    }
}

/// Dot product of every compressed vector of `m` with `x`.
fn gather(m: &CsMat<Intensity>, x: ArrayView1<Intensity>) -> Array1<Intensity> {
    (0..m.outer_dims())
        .into_par_iter()
        .map(|outer| {
            m.outer_view(outer).map_or(0.0, |v| v.iter().map(|(inner, &w)| w * x[inner]).sum())
        })
        .collect::<Vec<_>>()
        .into()
}

/// Sum of every compressed vector of `m`, scaled by the matching element of
/// `x`.
fn scatter(m: &CsMat<Intensity>, x: ArrayView1<Intensity>, len: usize) -> Array1<Intensity> {
    let n_outer = m.outer_dims();
    // Each job needs a whole output-sized accumulator, so don't let rayon
    // split the work more finely than one job per thread.
    let job_size = (n_outer / rayon::current_num_threads()).max(1);
    (0..n_outer)
        .into_par_iter()
        .fold_chunks(job_size, || vec![0.0; len], |mut acc, outer| {
            let scale = x[outer];
            if scale != 0.0 {
                if let Some(v) = m.outer_view(outer) {
                    for (inner, &w) in v.iter() {
                        acc[inner] += w * scale;
                    }
                }
            }
            acc
        })
        .reduce(|| vec![0.0; len], elementwise_add)
        .into()
}

fn elementwise_add(mut a: Vec<Intensity>, b: Vec<Intensity>) -> Vec<Intensity> {
    for (l, r) in a.iter_mut().zip(b) { *l += r }
    a
}
