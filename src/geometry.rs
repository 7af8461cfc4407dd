//! Placement of the diffraction orders on the detector canvas.
//!
//! Along each axis the canvas is laid out as
//!
//! ```text
//! b2 | negative arm | b1 | zeroth order | b1 | positive arm | b2
//! ```
//!
//! where the zeroth order is `n` pixels wide and each first-order arm is
//! `n + z' - shift` pixels wide: band `k` of the dispersed spectrum is offset
//! by `k - 1` pixels away from the centre, and `k` runs over
//! `1, 1 + shift, 1 + 2 shift, ...` up to the expanded band count
//! `z' = shift * z`.
//!
//! Both the system matrix builder and the forward simulator place their blocks
//! exclusively through `CanvasGeometry::anchors`, so that they cannot disagree.

use crate::error::ConfigError;
use crate::types::{CanvasDim, CubeDim, Index2};

/// One spatial replica of the dispersed scene on the detector.
///
/// The discriminants give the row of the order in the diffraction sensitivity
/// matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DiffractionOrder {
    Zeroth    = 0,
    North     = 1,
    South     = 2,
    West      = 3,
    East      = 4,
    NorthWest = 5,
    NorthEast = 6,
    SouthWest = 7,
    SouthEast = 8,
}

use DiffractionOrder::*;

pub const ALL_ORDERS: [DiffractionOrder; 9] = [
    Zeroth, North, South, West, East, NorthWest, NorthEast, SouthWest, SouthEast,
];

impl DiffractionOrder {

    /// Row in the diffraction sensitivity matrix
    pub fn index(self) -> usize { self as usize }

    /// Direction of dispersion as (row, column) signs
    pub fn direction(self) -> (isize, isize) {
        match self {
            Zeroth    => ( 0,  0),
            North     => (-1,  0),
            South     => ( 1,  0),
            West      => ( 0, -1),
            East      => ( 0,  1),
            NorthWest => (-1, -1),
            NorthEast => (-1,  1),
            SouthWest => ( 1, -1),
            SouthEast => ( 1,  1),
        }
    }
}

/// Which diffraction orders the diffractive optical element produces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OrderLayout {
    /// Zeroth order plus the four orders along the axes
    #[default]
    Five,
    /// Zeroth order plus all eight compass directions
    Nine,
}

impl OrderLayout {

    pub fn from_all_orders(all_orders: bool) -> Self {
        if all_orders { Self::Nine } else { Self::Five }
    }

    pub fn n_orders(self) -> usize { self.orders().len() }

    pub fn orders(self) -> &'static [DiffractionOrder] {
        match self {
            Self::Five => &ALL_ORDERS[..5],
            Self::Nine => &ALL_ORDERS[..],
        }
    }
}

/// Size of the cube, border widths and dispersion step: everything needed to
/// place blocks on the canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CanvasGeometry {
    n: CubeDim,
    b1: usize,
    b2: usize,
    shift: usize,
    layout: OrderLayout,
}

impl CanvasGeometry {

    pub fn new(n: CubeDim, b1: usize, b2: usize, shift: usize, layout: OrderLayout) -> Result<Self, ConfigError> {
        for (name, value) in ["x", "y", "z"].into_iter().zip(n) {
            if value == 0 { return Err(ConfigError::EmptyDimension { name, value }) }
        }
        if shift == 0 { return Err(ConfigError::ZeroShift(shift)) }
        Ok(Self { n, b1, b2, shift, layout })
    }

    pub fn cube_dims(&self) -> CubeDim     { self.n }
    pub fn b1       (&self) -> usize       { self.b1 }
    pub fn b2       (&self) -> usize       { self.b2 }
    pub fn shift    (&self) -> usize       { self.shift }
    pub fn layout   (&self) -> OrderLayout { self.layout }

    /// Spectral extent after dispersion stretches each band by `shift` pixels
    pub fn expanded_band_count(&self) -> usize { self.shift * self.n[2] }

    /// `[Gx, Gy]` with `G = 3n + 2z' + 2(b1 + b2 - shift)` along each axis
    pub fn canvas_size(&self) -> CanvasDim {
        [self.axis_length(self.n[0]), self.axis_length(self.n[1])]
    }

    pub fn n_pixels(&self) -> usize {
        let [gx, gy] = self.canvas_size();
        gx * gy
    }

    // z' >= shift, so the subtraction cannot underflow.
    fn axis_length(&self, n: usize) -> usize {
        3 * n + 2 * self.expanded_band_count() + 2 * (self.b1 + self.b2) - 2 * self.shift
    }

    fn arm_length(&self, n: usize) -> usize {
        n + self.expanded_band_count() - self.shift
    }

    fn centre(&self, n: usize) -> usize {
        self.b2 + self.arm_length(n) + self.b1
    }

    /// The band loop: `(band, k)` with `k = 1, 1 + shift, ...` up to `z'`
    pub fn band_steps(&self) -> impl Iterator<Item = (usize, usize)> {
        (1..=self.expanded_band_count())
            .step_by(self.shift)
            .enumerate()
    }

    /// Top-left pixel of the block of `order`, for dispersion step `k`
    pub fn anchor(&self, order: DiffractionOrder, k: usize) -> Index2 {
        let dispersion = k - 1;
        let (drow, dcol) = order.direction();
        [self.axis_anchor(self.n[0], drow, dispersion),
         self.axis_anchor(self.n[1], dcol, dispersion)]
    }

    fn axis_anchor(&self, n: usize, direction: isize, dispersion: usize) -> usize {
        let centre = self.centre(n);
        match direction.signum() {
            0 => centre,
            1 => centre + n + self.b1 + dispersion,
            _ => centre - self.b1 - n - dispersion,
        }
    }

    /// Anchors of all orders in the layout, for dispersion step `k`
    pub fn anchors(&self, k: usize) -> impl Iterator<Item = (DiffractionOrder, Index2)> + '_ {
        self.layout.orders().iter().map(move |&order| (order, self.anchor(order, k)))
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;
    use itertools::iproduct;
    #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};

    fn geometry(n: CubeDim, b1: usize, b2: usize, shift: usize, all_orders: bool) -> CanvasGeometry {
        CanvasGeometry::new(n, b1, b2, shift, OrderLayout::from_all_orders(all_orders)).unwrap()
    }

    #[rstest(/**/   n      , b1, b2, shift, expected,
             case([2, 2, 1],  1,  0,   1,      8),
             case([4, 4, 3],  1,  0,   1,     18),
             case([5, 5, 4],  2,  3,   2,     37),
             case([8, 8, 1],  0,  0,   1,     24),
             case([3, 3, 6],  1,  1,   3,     43),
    )]
    fn canvas_size(n: CubeDim, b1: usize, b2: usize, shift: usize, expected: usize) {
        let g = geometry(n, b1, b2, shift, false);
        assert_eq!(g.canvas_size(), [expected, expected]);
    }

    #[test]
    fn band_steps_follow_shift() {
        let g = geometry([2, 2, 4], 1, 0, 3, false);
        let steps: Vec<_> = g.band_steps().collect();
        assert_eq!(steps, vec![(0, 1), (1, 4), (2, 7), (3, 10)]);
    }

    #[rstest(/**/   n      , shift, expected,
             case([2, 2, 1],     0, ConfigError::ZeroShift(0)),
             case([0, 2, 1],     1, ConfigError::EmptyDimension { name: "x", value: 0 }),
             case([2, 2, 0],     1, ConfigError::EmptyDimension { name: "z", value: 0 }),
    )]
    fn degenerate_geometry_cannot_be_built(n: CubeDim, shift: usize, expected: ConfigError) {
        assert_eq!(CanvasGeometry::new(n, 1, 0, shift, OrderLayout::Five).unwrap_err(), expected);
    }

    #[test]
    fn accessors_report_construction_parameters() {
        let g = geometry([3, 4, 5], 2, 1, 3, true);
        assert_eq!(g.cube_dims(), [3, 4, 5]);
        assert_eq!((g.b1(), g.b2(), g.shift()), (2, 1, 3));
        assert_eq!(g.layout(), OrderLayout::Nine);
        assert_eq!(g.band_steps().count(), 5);
    }

    #[test]
    fn two_by_two_single_band_anchors() {
        let g = geometry([2, 2, 1], 1, 0, 1, false);
        let anchors: Vec<_> = g.anchors(1).collect();
        assert_eq!(anchors, vec![
            (Zeroth, [3, 3]),
            (North , [0, 3]),
            (South , [6, 3]),
            (West  , [3, 0]),
            (East  , [3, 6]),
        ]);
    }

    #[test]
    fn dispersion_moves_first_orders_outwards() {
        let g = geometry([3, 3, 4], 1, 0, 2, true);
        let k_last = 1 + 3 * 2;
        for order in ALL_ORDERS {
            let first = g.anchor(order, 1);
            let last  = g.anchor(order, k_last);
            let (dr, dc) = order.direction();
            assert_eq!(last[0] as isize - first[0] as isize, dr * 6);
            assert_eq!(last[1] as isize - first[1] as isize, dc * 6);
        }
    }

    // Every block of every band lies inside the canvas, and no two orders of
    // the same band overlap.
    proptest::proptest! {
        #[test]
        fn blocks_fit_without_overlap(
            nx in 1..12_usize,
            ny in 1..12_usize,
            nz in 1..8_usize,
            b1 in 0..4_usize,
            b2 in 0..4_usize,
            shift in 1..4_usize,
            all_orders in proptest::bool::ANY,
        ) {
            let g = geometry([nx, ny, nz], b1, b2, shift, all_orders);
            let [gx, gy] = g.canvas_size();
            for (_band, k) in g.band_steps() {
                let mut hits = ndarray::Array2::<u8>::zeros((gx, gy));
                for (_order, [r, c]) in g.anchors(k) {
                    assert!(r + nx <= gx && c + ny <= gy);
                    for (i, j) in iproduct!(0..nx, 0..ny) {
                        hits[[r + i, c + j]] += 1;
                    }
                }
                assert!(hits.iter().all(|&h| h <= 1));
                assert_eq!(hits.iter().filter(|&&h| h == 1).count(), g.layout().n_orders() * nx * ny);
            }
        }
    }
}
