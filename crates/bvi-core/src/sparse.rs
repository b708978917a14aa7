//! Sparse numeric vectors
//!
//! States, beliefs, outcome distributions and plane coefficients are all
//! stored as sorted `(index, value)` lists with explicit zeros removed.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A sparse vector of fixed logical dimension.
///
/// Entries are kept sorted by index, indices are unique and every stored
/// value is non-zero.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SparseVector {
    dim: usize,
    entries: Vec<(usize, f64)>,
}

impl SparseVector {
    /// Create an all-zero vector of dimension `dim`
    #[must_use]
    pub fn zeros(dim: usize) -> Self {
        Self {
            dim,
            entries: Vec::new(),
        }
    }

    /// Build from a dense slice, dropping zero entries
    #[must_use]
    pub fn from_dense(values: &[f64]) -> Self {
        let entries = values
            .iter()
            .enumerate()
            .filter(|(_, v)| **v != 0.0)
            .map(|(i, v)| (i, *v))
            .collect();
        Self {
            dim: values.len(),
            entries,
        }
    }

    /// Build from arbitrary `(index, value)` pairs.
    ///
    /// Pairs may come in any order; repeated indices are summed and zeros
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns [`crate::BoundError::DimensionMismatch`] if an index is not
    /// below `dim`.
    pub fn from_entries<I>(dim: usize, pairs: I) -> crate::Result<Self>
    where
        I: IntoIterator<Item = (usize, f64)>,
    {
        let mut raw: Vec<(usize, f64)> = pairs.into_iter().collect();
        if let Some(&(bad, _)) = raw.iter().find(|(i, _)| *i >= dim) {
            return Err(crate::BoundError::DimensionMismatch {
                expected: dim,
                actual: bad + 1,
            });
        }
        raw.sort_by_key(|(i, _)| *i);

        let mut entries: Vec<(usize, f64)> = Vec::with_capacity(raw.len());
        for (i, v) in raw {
            match entries.last_mut() {
                Some((last, acc)) if *last == i => *acc += v,
                _ => entries.push((i, v)),
            }
        }
        entries.retain(|(_, v)| *v != 0.0);

        Ok(Self { dim, entries })
    }

    /// Logical dimension
    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of stored (non-zero) entries
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    /// Check if every entry is zero
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(index, value)` pairs in index order
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.entries.iter().copied()
    }

    /// Iterate over the indices of non-zero entries
    pub fn support(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.iter().map(|(i, _)| *i)
    }

    /// Value at `index` (zero when absent)
    #[must_use]
    pub fn get(&self, index: usize) -> f64 {
        self.entries
            .binary_search_by_key(&index, |(i, _)| *i)
            .map_or(0.0, |pos| self.entries[pos].1)
    }

    /// Sum of all entries
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.entries.iter().map(|(_, v)| v).sum()
    }

    /// Inner product with another sparse vector
    #[must_use]
    pub fn dot(&self, other: &SparseVector) -> f64 {
        let mut a = self.entries.iter().peekable();
        let mut b = other.entries.iter().peekable();
        let mut total = 0.0;
        while let (Some(&&(ia, va)), Some(&&(ib, vb))) = (a.peek(), b.peek()) {
            match ia.cmp(&ib) {
                Ordering::Less => {
                    a.next();
                }
                Ordering::Greater => {
                    b.next();
                }
                Ordering::Equal => {
                    total += va * vb;
                    a.next();
                    b.next();
                }
            }
        }
        total
    }

    /// Multiply every entry by `factor`
    #[must_use]
    pub fn scaled(&self, factor: f64) -> Self {
        if factor == 0.0 {
            return Self::zeros(self.dim);
        }
        Self {
            dim: self.dim,
            entries: self.entries.iter().map(|(i, v)| (*i, v * factor)).collect(),
        }
    }

    /// Dense copy of the vector
    #[must_use]
    pub fn to_dense(&self) -> Vec<f64> {
        let mut out = vec![0.0; self.dim];
        for (i, v) in &self.entries {
            out[*i] = *v;
        }
        out
    }
}

impl fmt::Display for SparseVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (n, (i, v)) in self.entries.iter().enumerate() {
            if n > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{i}:{v}")?;
        }
        write!(f, "]")
    }
}
