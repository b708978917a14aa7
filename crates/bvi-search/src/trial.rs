//! Trial-recursion search driver

use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use bvi_core::{BoundError, Mdp, Result, ValueInterval};

use crate::node::NodeId;
use crate::relax::RelaxBound;

/// Outcome of a call to [`RelaxBound::initialize`]
#[derive(Debug, Clone, PartialEq)]
pub struct TrialReport {
    /// Trials run by this call
    pub trials: u64,
    /// Total backups performed by the search so far
    pub backups: u64,
    /// Nodes in the graph when the driver stopped
    pub nodes: usize,
    /// Root bounds when the driver stopped
    pub root: ValueInterval,
    /// Whether the root gap fell below the requested precision
    pub converged: bool,
    /// Wall-clock time spent in this call
    pub elapsed: Duration,
}

impl<'m, M: Mdp + ?Sized> RelaxBound<'m, M> {
    /// Refine bounds along the most promising path below `id`.
    ///
    /// Stops as soon as the node's gap is below `target_gap`; otherwise backs
    /// the node up, descends into the successor of the greedy upper-bound
    /// action with the largest upper bound (earliest outcome on ties) using
    /// `target_gap / discount`, and backs the node up again on the way out.
    pub fn trial(&mut self, id: NodeId, target_gap: f64, depth: u32) {
        let gap = self.index.node(id).gap();
        if gap < target_gap {
            trace!(depth, gap, target_gap, "trial terminating");
            return;
        }
        if self.config.max_depth.is_some_and(|max| depth >= max) {
            trace!(depth, gap, target_gap, "trial depth cap reached");
            self.backup(id);
            return;
        }

        let Some(best_action) = self.backup(id) else {
            return;
        };

        let node = self.index.node(id);
        let mut best: Option<(usize, f64, NodeId)> = None;
        for (o, edge) in node.actions[best_action].edges() {
            let upper = self.index.node(edge.successor).upper_bound;
            if best.map_or(true, |(_, v, _)| upper > v) {
                best = Some((o, upper, edge.successor));
            }
        }
        let Some((outcome, _, successor)) = best else {
            return;
        };

        trace!(
            depth,
            action = best_action,
            outcome,
            lb = node.lower_bound,
            ub = node.upper_bound,
            target_gap,
            "trial descending"
        );

        let next_target = target_gap / self.problem.discount();
        self.trial(successor, next_target, depth + 1);

        self.backup(id);
    }

    /// Run one trial from the root
    pub fn do_trial(&mut self, target_gap: f64) {
        self.stats.trials += 1;
        let root = self.root;
        self.trial(root, target_gap, 0);
    }

    /// Run trials until the root gap is below `target_precision`.
    ///
    /// Each trial targets `gap * discount` where `gap` is the current root
    /// gap. The configured `max_trials` budget, if any, is checked between
    /// trials.
    ///
    /// # Errors
    ///
    /// Returns [`BoundError::InvalidConfig`] for a non-positive precision and
    /// [`BoundError::InvalidModel`] if the root bounds are not finite.
    pub fn initialize(&mut self, target_precision: f64) -> Result<TrialReport> {
        if !(target_precision > 0.0) {
            return Err(BoundError::InvalidConfig(format!(
                "target precision must be positive, got {target_precision}"
            )));
        }

        let start = Instant::now();
        let discount = self.problem.discount();
        let mut trials = 0u64;

        let converged = loop {
            let root = self.index.node(self.root);
            let width = root.gap();
            if !width.is_finite() {
                return Err(BoundError::InvalidModel(format!(
                    "root bounds are not finite: {}",
                    root.interval()
                )));
            }
            debug!(trial = trials + 1, width, target = target_precision, "relax bound trial");
            if width < target_precision {
                break true;
            }
            if self.config.max_trials.is_some_and(|max| trials >= max) {
                warn!(trials, width, target = target_precision, "trial budget exhausted before convergence");
                break false;
            }
            self.do_trial(width * discount);
            trials += 1;
        };

        let report = TrialReport {
            trials,
            backups: self.stats.backups,
            nodes: self.index.len(),
            root: self.index.node(self.root).interval(),
            converged,
            elapsed: start.elapsed(),
        };
        info!(
            trials = report.trials,
            nodes = report.nodes,
            root = %report.root,
            elapsed_secs = report.elapsed.as_secs_f64(),
            "relax bound initialization finished"
        );
        Ok(report)
    }

    /// Run [`Self::initialize`] with the configured target precision
    ///
    /// # Errors
    ///
    /// As [`Self::initialize`].
    pub fn run(&mut self) -> Result<TrialReport> {
        let precision = self.config.target_precision;
        self.initialize(precision)
    }
}
