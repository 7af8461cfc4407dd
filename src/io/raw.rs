//! Read / write cubes and images as raw binary
//!
//! Layout: the number of dimensions and each dimension as little-endian `u64`,
//! followed by the values as little-endian `f64`, first index varying fastest
//! (the same order as `crate::index`).

use std::error::Error;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::Path;

use binrw::{binrw, BinRead, BinWrite, VecArgs};
use ndarray::{Array, ArrayBase, Data, Dimension, IxDyn, ShapeBuilder};

use crate::types::{Cube, Image, Intensity};

type Res<T> = Result<T, Box<dyn Error>>;

/// More dimensions than this means the header is garbage
pub const MAX_NDIM: u64 = 16;

const WORD: u64 = 8;

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq)]
struct Header {
    #[br(assert(ndim <= MAX_NDIM))]
    #[bw(calc = shape.len() as u64)]
    ndim: u64,

    #[br(count = ndim)]
    shape: Vec<u64>,
}

impl Header {
    fn size_in_bytes(&self) -> u64 { WORD * (1 + self.shape.len() as u64) }

    /// Number of values that follow the header, or `None` if it cannot be
    /// represented.
    fn element_count(&self) -> Option<usize> {
        self.shape.iter().try_fold(1_usize, |acc, &n| acc.checked_mul(usize::try_from(n).ok()?))
    }

    fn dims(&self) -> Option<Vec<usize>> {
        self.shape.iter().map(|&n| usize::try_from(n).ok()).collect()
    }
}

fn invalid_data(message: String) -> Box<dyn Error> {
    Box::new(std::io::Error::new(ErrorKind::InvalidData, message))
}

pub fn write<S, D>(array: &ArrayBase<S, D>, path: &Path) -> Res<()>
where
    S: Data<Elem = Intensity>,
    D: Dimension,
{
    let file = File::create(path)?;
    let mut buf = BufWriter::new(file);
    let header = Header { shape: array.shape().iter().map(|&n| n as u64).collect() };
    header.write_le(&mut buf)?;
    for datum in array.t().iter() {
        datum.write_le(&mut buf)?;
    }
    buf.flush()?;
    Ok(())
}

fn read_dyn(path: &Path) -> Res<Array<Intensity, IxDyn>> {
    let file = File::open(path)?;
    let file_size = file.metadata()?.len();
    let mut buf = BufReader::new(file);

    let header = Header::read_le(&mut buf)?;
    let (count, dims) = header.element_count().zip(header.dims())
        .ok_or_else(|| invalid_data(format!("raw header shape {:?} is too large", header.shape)))?;

    // The data must fill the rest of the file exactly
    let data_size = file_size.saturating_sub(header.size_in_bytes());
    let expected = (count as u64).checked_mul(WORD);
    if expected != Some(data_size) {
        return Err(invalid_data(format!(
            "raw header shape {:?} needs {count} values, but the file holds {} bytes of data",
            header.shape, data_size,
        )))
    }

    let data = Vec::<Intensity>::read_le_args(&mut buf, VecArgs { count, inner: () })?;
    Ok(Array::from_shape_vec(IxDyn(&dims).f(), data)?)
}

fn read_fixed<D: Dimension>(path: &Path) -> Res<Array<Intensity, D>> {
    Ok(read_dyn(path)?.into_dimensionality::<D>()?)
}

pub fn read_cube (path: &Path) -> Res<Cube>  { read_fixed(path) }
pub fn read_image(path: &Path) -> Res<Image> { read_fixed(path) }
