//! Beliefs over states and random simplex sampling

use rand::Rng;
use rand_distr::Exp1;
use tracing::debug;

use crate::{SparseVector, ValueInterval};

/// A probability distribution over states
pub type Belief = SparseVector;

/// Draw a belief uniformly from the probability simplex of dimension `dim`.
///
/// Uses normalised exponential samples, which is the flat Dirichlet.
#[must_use]
pub fn sample_simplex<R: Rng + ?Sized>(rng: &mut R, dim: usize) -> Belief {
    let mut weights: Vec<f64> = (0..dim).map(|_| rng.sample::<f64, _>(Exp1)).collect();
    let total: f64 = weights.iter().sum();
    if total > 0.0 {
        for w in &mut weights {
            *w /= total;
        }
    }
    SparseVector::from_dense(&weights)
}

/// Check that two interval-valued functions of belief agree.
///
/// Returns `true` if the intervals produced by `lhs` and `rhs` overlap at
/// every one of `num_samples` random beliefs of dimension `dim`.
pub fn consistent_with<L, H, R>(lhs: L, rhs: H, dim: usize, num_samples: usize, rng: &mut R) -> bool
where
    L: Fn(&Belief) -> ValueInterval,
    H: Fn(&Belief) -> ValueInterval,
    R: Rng + ?Sized,
{
    for _ in 0..num_samples {
        let b = sample_simplex(rng, dim);
        let left = lhs(&b);
        let right = rhs(&b);
        if !left.overlaps_with(&right) {
            debug!(belief = %b, lhs = %left, rhs = %right, "value functions inconsistent");
            return false;
        }
    }
    true
}
