//! Image removal check
//!
//! Fails a change to the manifest repository if any destination image present
//! at the baseline revision is missing from the candidate's edge set.

use std::collections::BTreeSet;

use super::errors::{CheckError, CheckResult, RemovedImages};
use super::revision::{RevisionConfig, RevisionReader, SharedWorktree};
use super::PreCheck;
use crate::edge::{EdgeBuilder, EdgeProjection, EdgeSet};
use crate::observability::{log_event_with_fields, Event};

pub struct ImageRemovalCheck<R> {
    revisions: RevisionConfig,
    worktree: SharedWorktree<R>,
    candidate_edges: EdgeSet,
}

impl<R: RevisionReader> ImageRemovalCheck<R> {
    /// `revisions` is validated at construction, so a malformed revision can
    /// never reach the working tree.
    pub fn new(
        revisions: RevisionConfig,
        worktree: SharedWorktree<R>,
        candidate_edges: EdgeSet,
    ) -> Self {
        Self {
            revisions,
            worktree,
            candidate_edges,
        }
    }

    pub fn revisions(&self) -> &RevisionConfig {
        &self.revisions
    }

    /// Compute the baseline edge set and compare it against the candidate.
    ///
    /// The working tree is restored to the candidate revision on every path
    /// out of the critical section. A failed restore is reported as
    /// `CheckError::RestoreFailed` and takes precedence over any other error.
    pub fn run(&self) -> CheckResult<()> {
        let baseline_edges = {
            let mut reader = self.worktree.lock();

            log_event_with_fields(
                Event::CheckoutStarted,
                &[("revision", self.revisions.baseline.as_str())],
            );
            let baseline = reader
                .materialize(&self.revisions.baseline)
                .and_then(|snapshot| EdgeBuilder::new().build(&snapshot).map_err(CheckError::from));

            let candidate = &self.revisions.candidate;
            if let Err(e) = reader.restore(candidate) {
                let err = CheckError::RestoreFailed {
                    revision: candidate.to_string(),
                    message: e.to_string(),
                };
                log_event_with_fields(
                    Event::CheckoutRestoreFailed,
                    &[("error", &err.to_string()), ("revision", candidate.as_str())],
                );
                return Err(err);
            }
            log_event_with_fields(Event::CheckoutRestored, &[("revision", candidate.as_str())]);

            baseline?
        };

        self.compare(&baseline_edges, &self.candidate_edges)
    }

    /// Compare a baseline edge set against a candidate one.
    pub fn compare(&self, baseline: &EdgeSet, candidate: &EdgeSet) -> CheckResult<()> {
        compare_edge_sets(baseline, candidate)
    }
}

/// Fail if any `(DstImageTag, Digest)` projection of `baseline` is absent
/// from `candidate`. Every missing image is reported.
pub fn compare_edge_sets(baseline: &EdgeSet, candidate: &EdgeSet) -> CheckResult<()> {
    let present = candidate.projections();
    let removed: BTreeSet<EdgeProjection> = baseline
        .projections()
        .into_iter()
        .filter(|projection| !present.contains(projection))
        .collect();

    if removed.is_empty() {
        Ok(())
    } else {
        Err(CheckError::ImagesRemoved(RemovedImages { removed }))
    }
}

impl<R: RevisionReader> PreCheck for ImageRemovalCheck<R> {
    fn name(&self) -> &'static str {
        "ImageRemovalCheck"
    }

    fn run(&self) -> CheckResult<()> {
        ImageRemovalCheck::run(self)
    }
}
