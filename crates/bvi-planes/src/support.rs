//! Per-dimension index of planes

use bvi_core::{Belief, DominanceMode};

use crate::plane::{LbPlane, PlaneId};

/// Maps every state dimension to the planes defined at that dimension.
///
/// Kept in lockstep with plane membership by the store: a plane is listed
/// under dimension `i` exactly when it is live and defined at `i`.
#[derive(Debug, Clone, Default)]
pub struct SupportIndex {
    lists: Vec<Vec<PlaneId>>,
}

impl SupportIndex {
    /// Create an empty index over `dim` dimensions
    #[must_use]
    pub fn new(dim: usize) -> Self {
        Self {
            lists: vec![Vec::new(); dim],
        }
    }

    fn dims_of(plane: &LbPlane, mode: DominanceMode) -> Vec<usize> {
        match mode {
            DominanceMode::Masked => plane.defined_dims(),
            DominanceMode::Unmasked => (0..plane.dim()).collect(),
        }
    }

    /// Register `id` under every dimension of `plane`
    pub fn insert(&mut self, id: PlaneId, plane: &LbPlane, mode: DominanceMode) {
        for i in Self::dims_of(plane, mode) {
            if let Some(list) = self.lists.get_mut(i) {
                list.push(id);
            }
        }
    }

    /// Remove `id` from every list it appears in
    pub fn remove(&mut self, id: PlaneId, plane: &LbPlane, mode: DominanceMode) {
        for i in Self::dims_of(plane, mode) {
            if let Some(list) = self.lists.get_mut(i) {
                if let Some(pos) = list.iter().position(|p| *p == id) {
                    list.remove(pos);
                }
            }
        }
    }

    /// Planes defined at dimension `i`
    #[must_use]
    pub fn planes_at(&self, i: usize) -> &[PlaneId] {
        self.lists.get(i).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The shortest list among the dimensions where `belief` is non-zero.
    ///
    /// Every plane applicable to `belief` appears in that list. Returns
    /// `None` for an all-zero belief.
    #[must_use]
    pub fn candidates(&self, belief: &Belief) -> Option<&[PlaneId]> {
        belief
            .support()
            .map(|i| self.planes_at(i))
            .min_by_key(|list| list.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bvi_core::SparseVector;

    #[test]
    fn candidates_use_least_populated_dimension() {
        let mut index = SupportIndex::new(3);
        let total = LbPlane::new(SparseVector::from_dense(&[1.0, 1.0, 1.0]), 0);
        let narrow = LbPlane::masked(SparseVector::from_dense(&[1.0, 0.0, 0.0]), 1, vec![0]).unwrap();
        index.insert(PlaneId(0), &total, DominanceMode::Masked);
        index.insert(PlaneId(1), &narrow, DominanceMode::Masked);

        assert_eq!(index.planes_at(0), &[PlaneId(0), PlaneId(1)]);
        let belief = SparseVector::from_dense(&[0.5, 0.0, 0.5]);
        assert_eq!(index.candidates(&belief), Some(&[PlaneId(0)][..]));

        index.remove(PlaneId(0), &total, DominanceMode::Masked);
        assert_eq!(index.candidates(&belief), Some(&[][..]));
        assert_eq!(index.planes_at(0), &[PlaneId(1)]);
    }

    #[test]
    fn unmasked_planes_are_listed_everywhere() {
        let mut index = SupportIndex::new(2);
        let narrow = LbPlane::masked(SparseVector::from_dense(&[1.0, 0.0]), 1, vec![0]).unwrap();
        index.insert(PlaneId(4), &narrow, DominanceMode::Unmasked);
        assert_eq!(index.planes_at(1), &[PlaneId(4)]);
        assert_eq!(index.candidates(&SparseVector::zeros(2)), None);
    }
}
