use ndarray::{Array1, Array2, Array3};

pub type Intensity = f64;
pub type Pixels    = f64;

pub type Index1 = usize;
pub type Index2 = [usize; 2];
pub type Index3 = [usize; 3];

/// Spatial rows, spatial columns, spectral bands
pub type CubeDim   = [usize; 3];
/// Rows and columns of the CTIS detector canvas
pub type CanvasDim = [usize; 2];

pub type Cube        = Array3<Intensity>;
pub type Image       = Array2<Intensity>;
pub type CubeVector  = Array1<Intensity>;
pub type ImageVector = Array1<Intensity>;
