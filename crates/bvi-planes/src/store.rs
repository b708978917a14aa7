//! Max-planes lower bound store
//!
//! The lower bound at a belief is the best inner product among the planes
//! applicable to it. Planes are added by an outer solver during its
//! backups; the store periodically removes dominated planes and forwards
//! any external cache slots that pointed at a removed plane to the plane
//! that dominated it.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use bvi_core::{Belief, BoundError, PlaneConfig, Result};

use crate::plane::{LbPlane, PlaneId};
use crate::support::SupportIndex;

/// Handle to an external cache slot that refers to a plane.
///
/// The store rewrites the slot whenever the plane it points at is pruned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheRef(usize);

/// Summary of one pruning pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruneReport {
    /// Planes before pruning
    pub before: usize,
    /// Planes after pruning
    pub after: usize,
    /// Planes removed because nothing referred to them
    pub ref_count_deletions: usize,
}

impl PruneReport {
    /// Total planes removed
    #[must_use]
    pub fn removed(&self) -> usize {
        self.before - self.after
    }
}

#[derive(Debug, Clone)]
struct PlaneSlot {
    plane: LbPlane,
    /// Backup counter when the plane was added
    created_at: i64,
    back_pointers: Vec<CacheRef>,
}

/// Set of lower-bound planes with dominance pruning
#[derive(Debug, Clone)]
pub struct PlaneStore {
    num_states: usize,
    config: PlaneConfig,
    slots: Vec<Option<PlaneSlot>>,
    /// Live planes in scan order
    planes: Vec<PlaneId>,
    support: Option<SupportIndex>,
    /// Cache slot table; `None` once the slot is released or its plane was
    /// deleted without a dominator
    refs: Vec<Option<PlaneId>>,
    num_backups: i64,
    last_prune_num_backups: i64,
    last_prune_num_planes: usize,
}

impl PlaneStore {
    /// Create an empty store over `num_states` dimensions
    ///
    /// # Errors
    ///
    /// Returns [`BoundError::InvalidConfig`] for a negative prune epsilon or a
    /// prune factor below one.
    pub fn new(num_states: usize, config: &PlaneConfig) -> Result<Self> {
        if !(config.prune_epsilon >= 0.0) {
            return Err(BoundError::InvalidConfig(format!(
                "planes.prune_epsilon must be non-negative, got {}",
                config.prune_epsilon
            )));
        }
        if !(config.prune_factor >= 1.0) {
            return Err(BoundError::InvalidConfig(format!(
                "planes.prune_factor must be at least 1, got {}",
                config.prune_factor
            )));
        }

        Ok(Self {
            num_states,
            config: config.clone(),
            slots: Vec::new(),
            planes: Vec::new(),
            support: config
                .use_support_list
                .then(|| SupportIndex::new(num_states)),
            refs: Vec::new(),
            num_backups: 0,
            last_prune_num_backups: -1,
            last_prune_num_planes: 0,
        })
    }

    /// Number of state dimensions
    #[must_use]
    pub fn num_states(&self) -> usize {
        self.num_states
    }

    /// Configuration in use
    #[must_use]
    pub fn config(&self) -> &PlaneConfig {
        &self.config
    }

    /// Number of live planes
    #[must_use]
    pub fn len(&self) -> usize {
        self.planes.len()
    }

    /// Check if the store holds no planes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.planes.is_empty()
    }

    /// Backups completed so far
    #[must_use]
    pub fn num_backups(&self) -> i64 {
        self.num_backups
    }

    /// Borrow a live plane
    #[must_use]
    pub fn plane(&self, id: PlaneId) -> Option<&LbPlane> {
        self.slot(id).map(|slot| &slot.plane)
    }

    /// Backup counter at which a live plane was added
    #[must_use]
    pub fn created_at(&self, id: PlaneId) -> Option<i64> {
        self.slot(id).map(|slot| slot.created_at)
    }

    /// Iterate over live planes in scan order
    pub fn iter(&self) -> impl Iterator<Item = (PlaneId, &LbPlane)> + '_ {
        self.planes
            .iter()
            .filter_map(move |id| self.plane(*id).map(|plane| (*id, plane)))
    }

    /// The per-dimension index, if enabled
    #[must_use]
    pub fn support_index(&self) -> Option<&SupportIndex> {
        self.support.as_ref()
    }

    fn slot(&self, id: PlaneId) -> Option<&PlaneSlot> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    fn slot_mut(&mut self, id: PlaneId) -> Result<&mut PlaneSlot> {
        self.slots
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(BoundError::UnknownPlane(id.0))
    }

    /// Insert a plane and register it in the support index.
    ///
    /// The plane is stamped with the current backup counter.
    ///
    /// # Errors
    ///
    /// Returns [`BoundError::DimensionMismatch`] if the plane's dimension
    /// differs from the store's.
    pub fn add_plane(&mut self, plane: LbPlane) -> Result<PlaneId> {
        if plane.dim() != self.num_states {
            return Err(BoundError::DimensionMismatch {
                expected: self.num_states,
                actual: plane.dim(),
            });
        }

        let id = PlaneId(self.slots.len());
        if let Some(support) = self.support.as_mut() {
            support.insert(id, &plane, self.config.dominance);
        }
        trace!(plane = id.0, action = plane.action, "adding plane");
        self.slots.push(Some(PlaneSlot {
            plane,
            created_at: self.num_backups,
            back_pointers: Vec::new(),
        }));
        self.planes.push(id);
        Ok(id)
    }

    fn applicable(&self, id: PlaneId, belief: &Belief) -> Option<&LbPlane> {
        self.plane(id)
            .filter(|plane| plane.applies_to(belief, self.config.dominance))
    }

    fn candidates<'a>(&'a self, belief: &Belief) -> &'a [PlaneId] {
        match &self.support {
            Some(index) => index.candidates(belief).unwrap_or(&self.planes),
            None => &self.planes,
        }
    }

    /// The applicable plane with the largest value at `belief`.
    ///
    /// Ties go to the plane scanned first. Returns `None` when no plane
    /// applies.
    #[must_use]
    pub fn best_plane(&self, belief: &Belief) -> Option<PlaneId> {
        let mut best: Option<(PlaneId, f64)> = None;
        for &id in self.candidates(belief) {
            if let Some(plane) = self.applicable(id, belief) {
                let value = plane.value(belief);
                if best.map_or(true, |(_, v)| value > v) {
                    best = Some((id, value));
                }
            }
        }
        best.map(|(id, _)| id)
    }

    /// Improve on a cached plane.
    ///
    /// Starts from `current` and only examines planes added at or after
    /// backup `since_backup`, which is sound when `current` was the best
    /// plane as of that backup. Falls back to [`Self::best_plane`] if
    /// `current` is no longer live.
    #[must_use]
    pub fn best_plane_with_cache(
        &self,
        belief: &Belief,
        current: PlaneId,
        since_backup: i64,
    ) -> Option<PlaneId> {
        let Some(current_plane) = self.plane(current) else {
            return self.best_plane(belief);
        };

        let mut best = (current, current_plane.value(belief));
        for &id in self.candidates(belief) {
            let Some(slot) = self.slot(id) else { continue };
            if slot.created_at < since_backup {
                continue;
            }
            if let Some(plane) = self.applicable(id, belief) {
                let value = plane.value(belief);
                if value > best.1 {
                    best = (id, value);
                }
            }
        }
        Some(best.0)
    }

    /// Lower bound at `belief`
    #[must_use]
    pub fn value(&self, belief: &Belief) -> Option<f64> {
        self.best_plane(belief)
            .and_then(|id| self.plane(id))
            .map(|plane| plane.value(belief))
    }

    /// Action of the best plane at `belief`
    #[must_use]
    pub fn best_action(&self, belief: &Belief) -> Option<usize> {
        self.best_plane(belief)
            .and_then(|id| self.plane(id))
            .map(|plane| plane.action)
    }

    /// Open an external cache slot pointing at `id`
    ///
    /// # Errors
    ///
    /// Returns [`BoundError::UnknownPlane`] if `id` is not live.
    pub fn register_cache(&mut self, id: PlaneId) -> Result<CacheRef> {
        let cache = CacheRef(self.refs.len());
        self.slot_mut(id)?.back_pointers.push(cache);
        self.refs.push(Some(id));
        Ok(cache)
    }

    /// Repoint an existing cache slot at `id`
    ///
    /// # Errors
    ///
    /// Returns [`BoundError::UnknownPlane`] if `id` is not live.
    pub fn set_cache(&mut self, cache: CacheRef, id: PlaneId) -> Result<()> {
        self.slot_mut(id)?;
        self.detach(cache);
        self.slot_mut(id)?.back_pointers.push(cache);
        if let Some(entry) = self.refs.get_mut(cache.0) {
            *entry = Some(id);
        }
        Ok(())
    }

    /// Close a cache slot so it no longer keeps its plane alive
    pub fn release_cache(&mut self, cache: CacheRef) {
        self.detach(cache);
        if let Some(entry) = self.refs.get_mut(cache.0) {
            *entry = None;
        }
    }

    /// Plane a cache slot currently points at
    #[must_use]
    pub fn resolve(&self, cache: CacheRef) -> Option<PlaneId> {
        self.refs.get(cache.0).copied().flatten()
    }

    /// Number of cache slots pointing at `id`
    #[must_use]
    pub fn ref_count(&self, id: PlaneId) -> usize {
        self.slot(id).map_or(0, |slot| slot.back_pointers.len())
    }

    fn detach(&mut self, cache: CacheRef) {
        let Some(old) = self.resolve(cache) else { return };
        if let Some(Some(slot)) = self.slots.get_mut(old.0) {
            slot.back_pointers.retain(|c| *c != cache);
        }
    }

    /// Remove `victim` and hand its cache slots to `dominator`
    fn delete_and_forward(&mut self, victim: PlaneId, dominator: Option<PlaneId>) {
        let Some(slot) = self.slots.get_mut(victim.0).and_then(Option::take) else {
            return;
        };
        if let Some(support) = self.support.as_mut() {
            support.remove(victim, &slot.plane, self.config.dominance);
        }
        for cache in &slot.back_pointers {
            if let Some(entry) = self.refs.get_mut(cache.0) {
                *entry = dominator;
            }
        }
        if let Some(winner) = dominator
            .and_then(|d| self.slots.get_mut(d.0))
            .and_then(Option::as_mut)
        {
            winner.back_pointers.extend(slot.back_pointers);
        }
    }

    fn plane_pair(&self, a: PlaneId, b: PlaneId) -> Option<(&PlaneSlot, &PlaneSlot)> {
        Some((self.slot(a)?, self.slot(b)?))
    }

    /// Remove dominated planes.
    ///
    /// Each candidate is compared against the planes kept before it. Pairs
    /// that were both present at the previous prune are skipped. A candidate
    /// that dominates a kept plane replaces it; a kept plane that dominates
    /// the candidate moves to the front of the scan order. With reference
    /// counting enabled, planes no cache slot refers to are dropped outright.
    pub fn prune(&mut self) -> PruneReport {
        let before = self.planes.len();
        let epsilon = self.config.prune_epsilon;
        let mode = self.config.dominance;
        let last = self.last_prune_num_backups;
        let mut ref_count_deletions = 0;

        let order = std::mem::take(&mut self.planes);
        let mut kept: Vec<PlaneId> = Vec::with_capacity(order.len());

        for candidate in order {
            if self.config.use_ref_count_prune && self.ref_count(candidate) == 0 {
                self.delete_and_forward(candidate, None);
                ref_count_deletions += 1;
                continue;
            }

            let mut candidate_pruned = false;
            let mut i = 0;
            while i < kept.len() {
                let member = kept[i];
                let Some((cand_slot, member_slot)) = self.plane_pair(candidate, member) else {
                    i += 1;
                    continue;
                };
                if cand_slot.created_at <= last && member_slot.created_at <= last {
                    i += 1;
                } else if cand_slot.plane.dominates(&member_slot.plane, epsilon, mode) {
                    self.delete_and_forward(member, Some(candidate));
                    kept.remove(i);
                } else if member_slot.plane.dominates(&cand_slot.plane, epsilon, mode) {
                    self.delete_and_forward(candidate, Some(member));
                    kept.remove(i);
                    kept.insert(0, member);
                    candidate_pruned = true;
                    break;
                } else {
                    i += 1;
                }
            }
            if !candidate_pruned {
                kept.push(candidate);
            }
        }

        self.planes = kept;
        self.last_prune_num_planes = self.planes.len();
        self.last_prune_num_backups = self.num_backups;
        // Close the epoch so planes added after this prune are compared next time.
        self.num_backups += 1;

        let report = PruneReport {
            before,
            after: self.planes.len(),
            ref_count_deletions,
        };
        debug!(
            before = report.before,
            after = report.after,
            ref_count_deletions = report.ref_count_deletions,
            "pruned lower bound planes"
        );
        report
    }

    /// Plane count above which the next automatic prune fires
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    pub fn next_prune_threshold(&self) -> usize {
        let grown = (self.last_prune_num_planes as f64 * self.config.prune_factor) as usize;
        (self.last_prune_num_planes + self.config.prune_increment).max(grown)
    }

    /// Prune if the plane count grew past [`Self::next_prune_threshold`]
    pub fn maybe_prune(&mut self) -> Option<PruneReport> {
        (self.planes.len() > self.next_prune_threshold()).then(|| self.prune())
    }

    /// Mark the end of one outer backup and prune if the store has grown
    pub fn finish_backup(&mut self) -> Option<PruneReport> {
        self.num_backups += 1;
        self.maybe_prune()
    }

    /// Treat every current plane as already pruned.
    ///
    /// Used after loading a policy that was pruned before it was written.
    pub(crate) fn mark_loaded(&mut self) {
        self.last_prune_num_planes = self.planes.len();
        self.last_prune_num_backups = -1;
    }
}
