//! Conversion between multidimensional and flat indices.
//!
//! Cubes and images are vectorized column-major: the first (row) index varies
//! fastest, then the column, then the spectral band. The columns of the system
//! matrix follow the cube order and its rows follow the image order, so these
//! functions are the only place where that convention is spelled out.

use ndarray::{Array1, Array2, Array3, ArrayView2, ArrayView3, ShapeBuilder};

use crate::error::ConfigError;
use crate::types::{CanvasDim, CubeDim, Index1, Index2, Intensity};

use std::ops::{Add, Div, Mul, Rem};

pub fn index3_to_1<T>([ix, iy, iz]: [T; 3], [nx, ny, _nz]: [T; 3]) -> T
where
    T: Mul<Output = T> + Add<Output = T>
{
    ix + (iy + iz * ny) * nx
}

#[allow(clippy::many_single_char_names)]
pub fn index1_to_3<T>(i: T, [nx, ny, _nz]: [T; 3]) -> [T; 3]
where
    T: Mul<Output = T> +
    Div<Output = T> +
    Rem<Output = T> +
    Copy
{
    let z = i / (nx * ny);
    let r = i % (nx * ny);
    let y = r / nx;
    let x = r % nx;
    [x,y,z]
}

#[inline]
pub fn pixel_to_1([row, col]: Index2, [nrows, _ncols]: CanvasDim) -> Index1 {
    row + col * nrows
}

#[inline]
pub fn pixel_from_1(i: Index1, [nrows, _ncols]: CanvasDim) -> Index2 {
    [i % nrows, i / nrows]
}

/// Flatten a cube into the voxel order used by the system matrix columns.
pub fn vectorize_cube(cube: ArrayView3<Intensity>) -> Array1<Intensity> {
    // Reversing the axes turns the standard (last axis fastest) traversal into
    // a first-axis-fastest one.
    cube.t().iter().copied().collect()
}

pub fn unvectorize_cube(data: Array1<Intensity>, [nx, ny, nz]: CubeDim) -> Result<Array3<Intensity>, ConfigError> {
    let len = data.len();
    Array3::from_shape_vec((nx, ny, nz).f(), data.to_vec())
        .map_err(|_| ConfigError::VectorLength { what: "cube", expected: nx * ny * nz, got: len })
}

/// Flatten an image into the pixel order used by the system matrix rows.
pub fn vectorize_image(image: ArrayView2<Intensity>) -> Array1<Intensity> {
    image.t().iter().copied().collect()
}

pub fn unvectorize_image(data: Array1<Intensity>, [nrows, ncols]: CanvasDim) -> Result<Array2<Intensity>, ConfigError> {
    let len = data.len();
    Array2::from_shape_vec((nrows, ncols).f(), data.to_vec())
        .map_err(|_| ConfigError::VectorLength { what: "image", expected: nrows * ncols, got: len })
}

pub fn voxel_count([nx, ny, nz]: CubeDim) -> usize { nx * ny * nz }
