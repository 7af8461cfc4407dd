//! Figures of merit for comparing a reconstruction with the true cube.

use ndarray::{ArrayBase, Data, Dimension, Zip};

use crate::types::Intensity;

/// Sum of all values: the total energy in an image or cube.
pub fn total_energy<S, D>(a: &ArrayBase<S, D>) -> Intensity
where
    S: Data<Elem = Intensity>,
    D: Dimension,
{
    a.sum()
}

/// `‖estimate − truth‖₂ / ‖truth‖₂`, or the plain norm of the estimate when
/// the truth is identically zero.
pub fn relative_error<S1, S2, D>(estimate: &ArrayBase<S1, D>, truth: &ArrayBase<S2, D>) -> Intensity
where
    S1: Data<Elem = Intensity>,
    S2: Data<Elem = Intensity>,
    D: Dimension,
{
    let mut diff2 = 0.0;
    Zip::from(estimate).and(truth).for_each(|&e, &t| diff2 += (e - t) * (e - t));
    let norm2 = truth.iter().map(|t| t * t).sum::<Intensity>();
    if norm2 > 0.0 { (diff2 / norm2).sqrt() } else { diff2.sqrt() }
}

/// Root mean square difference.
pub fn rmse<S1, S2, D>(estimate: &ArrayBase<S1, D>, truth: &ArrayBase<S2, D>) -> Intensity
where
    S1: Data<Elem = Intensity>,
    S2: Data<Elem = Intensity>,
    D: Dimension,
{
    let n = truth.len();
    if n == 0 { return 0.0 }
    let mut diff2 = 0.0;
    Zip::from(estimate).and(truth).for_each(|&e, &t| diff2 += (e - t) * (e - t));
    (diff2 / n as Intensity).sqrt()
}
