//! Lower-bound planes (alpha vectors tagged with an action)

use serde::{Deserialize, Serialize};

use bvi_core::{Belief, BoundError, DominanceMode, Result, SparseVector};

/// Handle to a plane stored in a [`crate::PlaneStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlaneId(pub(crate) usize);

impl PlaneId {
    /// Raw slot index
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A linear lower bound on the value function, valid over part of the
/// belief simplex.
///
/// When `support` is `None` the plane is a total function. Otherwise it is
/// only defined for beliefs whose non-zero entries all fall inside the
/// support.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LbPlane {
    /// Coefficient per state
    pub coefficients: SparseVector,
    /// Action achieving this bound
    pub action: usize,
    /// Sorted dimensions where the plane is defined
    pub support: Option<Vec<usize>>,
}

impl LbPlane {
    /// Create a plane defined over the whole simplex
    #[must_use]
    pub fn new(coefficients: SparseVector, action: usize) -> Self {
        Self {
            coefficients,
            action,
            support: None,
        }
    }

    /// Create a plane defined only over `support`.
    ///
    /// # Errors
    ///
    /// Returns [`BoundError::DimensionMismatch`] if a support dimension is out
    /// of range, or [`BoundError::InvalidModel`] if a non-zero coefficient
    /// lies outside the support.
    pub fn masked(coefficients: SparseVector, action: usize, mut support: Vec<usize>) -> Result<Self> {
        support.sort_unstable();
        support.dedup();
        if let Some(&bad) = support.iter().find(|i| **i >= coefficients.dim()) {
            return Err(BoundError::DimensionMismatch {
                expected: coefficients.dim(),
                actual: bad + 1,
            });
        }
        if let Some(outside) = coefficients
            .support()
            .find(|i| support.binary_search(i).is_err())
        {
            return Err(BoundError::InvalidModel(format!(
                "plane coefficient at {outside} lies outside its support"
            )));
        }
        Ok(Self {
            coefficients,
            action,
            support: Some(support),
        })
    }

    /// Number of states the plane ranges over
    #[must_use]
    pub fn dim(&self) -> usize {
        self.coefficients.dim()
    }

    /// Inner product with a belief
    #[must_use]
    pub fn value(&self, belief: &Belief) -> f64 {
        self.coefficients.dot(belief)
    }

    /// Check whether dimension `i` is inside the plane's support
    #[must_use]
    pub fn is_defined_at(&self, i: usize) -> bool {
        match &self.support {
            None => i < self.dim(),
            Some(support) => support.binary_search(&i).is_ok(),
        }
    }

    /// Dimensions the plane is defined at
    #[must_use]
    pub fn defined_dims(&self) -> Vec<usize> {
        match &self.support {
            None => (0..self.dim()).collect(),
            Some(support) => support.clone(),
        }
    }

    /// Check whether the plane may be evaluated at `belief`
    #[must_use]
    pub fn applies_to(&self, belief: &Belief, mode: DominanceMode) -> bool {
        match mode {
            DominanceMode::Unmasked => true,
            DominanceMode::Masked => belief.support().all(|i| self.is_defined_at(i)),
        }
    }

    /// Check whether `self` is at least as good as `other` wherever `other`
    /// is defined, up to `epsilon`.
    ///
    /// In masked mode `other`'s support must also lie inside `self`'s. In
    /// unmasked mode masks are ignored and every dimension is compared.
    #[must_use]
    pub fn dominates(&self, other: &LbPlane, epsilon: f64, mode: DominanceMode) -> bool {
        match mode {
            DominanceMode::Unmasked => (0..self.dim().max(other.dim()))
                .all(|i| self.coefficients.get(i) >= other.coefficients.get(i) - epsilon),
            DominanceMode::Masked => other.defined_dims().into_iter().all(|i| {
                self.is_defined_at(i)
                    && self.coefficients.get(i) >= other.coefficients.get(i) - epsilon
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plane(values: &[f64], action: usize) -> LbPlane {
        LbPlane::new(SparseVector::from_dense(values), action)
    }

    #[test]
    fn masked_rejects_coefficients_outside_support() {
        let coefficients = SparseVector::from_dense(&[1.0, 0.0, 2.0]);
        assert!(LbPlane::masked(coefficients.clone(), 0, vec![0, 2]).is_ok());
        assert!(matches!(
            LbPlane::masked(coefficients.clone(), 0, vec![0]),
            Err(BoundError::InvalidModel(_))
        ));
        assert!(matches!(
            LbPlane::masked(coefficients, 0, vec![0, 2, 3]),
            Err(BoundError::DimensionMismatch { expected: 3, actual: 4 })
        ));
    }

    #[test]
    fn applicability_follows_mask() {
        let p = LbPlane::masked(SparseVector::from_dense(&[1.0, 0.0, 0.0]), 0, vec![0, 1]).unwrap();
        let inside = SparseVector::from_dense(&[0.5, 0.5, 0.0]);
        let outside = SparseVector::from_dense(&[0.5, 0.0, 0.5]);
        assert!(p.applies_to(&inside, DominanceMode::Masked));
        assert!(!p.applies_to(&outside, DominanceMode::Masked));
        assert!(p.applies_to(&outside, DominanceMode::Unmasked));
    }

    #[test]
    fn pointwise_dominance() {
        let high = plane(&[2.0, 1.0], 0);
        let low = plane(&[1.0, 1.0], 1);
        let crossing = plane(&[0.0, 3.0], 1);
        for mode in [DominanceMode::Masked, DominanceMode::Unmasked] {
            assert!(high.dominates(&low, 1e-10, mode));
            assert!(!low.dominates(&high, 1e-10, mode));
            assert!(!high.dominates(&crossing, 1e-10, mode));
            assert!(!crossing.dominates(&high, 1e-10, mode));
        }
    }

    #[test]
    fn narrow_plane_cannot_dominate_wider_one() {
        let narrow = LbPlane::masked(SparseVector::from_dense(&[5.0, 0.0]), 0, vec![0]).unwrap();
        let wide = plane(&[1.0, 1.0], 0);
        assert!(!narrow.dominates(&wide, 1e-10, DominanceMode::Masked));
        assert!(!narrow.dominates(&wide, 1e-10, DominanceMode::Unmasked));
        // A total plane with larger values covers the narrow one
        let wider = plane(&[5.0, -1.0], 1);
        assert!(wider.dominates(&narrow, 1e-10, DominanceMode::Masked));
    }

    #[test]
    fn tolerance_absorbs_rounding() {
        let a = plane(&[1.0, 1.0], 0);
        let b = plane(&[1.0 + 1e-12, 1.0], 0);
        assert!(a.dominates(&b, 1e-10, DominanceMode::Masked));
        assert!(!a.dominates(&b, 0.0, DominanceMode::Masked));
    }
}
