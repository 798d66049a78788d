//! Audit verifier
//!
//! Classifies registry mutation events against a long-lived promotion edge
//! set. Each event is matched on `(DstImageTag, Digest)`; the edge set is
//! read-only between refreshes, so `verify` may be called concurrently.
//!
//! Repeated delivery of the same event yields the same verdict. Only the
//! first delivery counts towards the `AuditSummary`.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use serde::Serialize;

use super::event::RegistryEvent;
use super::transaction::{Verdict, VerificationTransaction};
use crate::edge::{EdgeProjection, EdgeSet};
use crate::observability::{log_event_with_fields, Event};
use crate::registry::Digest;

/// Unique verdict counts since the last refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AuditSummary {
    pub verified: usize,
    pub rejected: usize,
}

impl AuditSummary {
    pub fn total(&self) -> usize {
        self.verified + self.rejected
    }

    /// No transaction was rejected.
    pub fn is_clean(&self) -> bool {
        self.rejected == 0
    }
}

/// Result of one `verify` call.
#[derive(Debug, Clone)]
pub struct VerificationOutcome {
    pub transaction: VerificationTransaction,
    /// False when the same event was already classified.
    pub first_seen: bool,
    /// Expected fat-manifest children not yet verified when this parent was.
    pub pending_children: usize,
}

/// Edge set indexed for lookup by event projection.
#[derive(Debug, Default)]
struct EdgeIndex {
    /// Projection to the parent digest of the matching edge.
    edges: HashMap<EdgeProjection, Option<Digest>>,
    /// `(path, parent digest)` to the child digests expected under it.
    children: HashMap<(String, Digest), BTreeSet<Digest>>,
}

impl EdgeIndex {
    fn build(edges: &EdgeSet) -> Self {
        let mut index = Self::default();
        for edge in edges {
            // Identical projections can only differ in source fields.
            index
                .edges
                .entry(edge.projection())
                .or_insert_with(|| edge.parent_digest.clone());
            if let Some(parent) = &edge.parent_digest {
                index
                    .children
                    .entry((edge.dst.image_path.clone(), parent.clone()))
                    .or_default()
                    .insert(edge.digest.clone());
            }
        }
        index
    }
}

#[derive(Debug, Default)]
struct VerifierState {
    seen: HashSet<EdgeProjection>,
    /// Verified fat-manifest children as `(path, digest)`.
    verified_children: HashSet<(String, Digest)>,
    summary: AuditSummary,
}

pub struct AuditVerifier {
    index: RwLock<Arc<EdgeIndex>>,
    state: Mutex<VerifierState>,
}

impl AuditVerifier {
    pub fn new(edges: &EdgeSet) -> Self {
        Self {
            index: RwLock::new(Arc::new(EdgeIndex::build(edges))),
            state: Mutex::new(VerifierState::default()),
        }
    }

    /// Classify one event.
    pub fn verify(&self, event: RegistryEvent) -> VerificationOutcome {
        let mut state = self.lock_state();
        let index = self.current_index();
        let projection = event.projection();

        let verdict = match index.edges.get(&projection) {
            Some(parent_digest) => Verdict::Verified {
                parent_digest: parent_digest.clone(),
            },
            None => Verdict::Rejected,
        };

        let first_seen = state.seen.insert(projection);
        if first_seen {
            if verdict.is_verified() {
                state.summary.verified += 1;
            } else {
                state.summary.rejected += 1;
            }
        }

        let mut pending_children = 0;
        if let Verdict::Verified { parent_digest } = &verdict {
            match parent_digest {
                Some(_) => {
                    state
                        .verified_children
                        .insert((event.path.clone(), event.digest.clone()));
                }
                None => pending_children = check_children(&index, &state, &event),
            }
        }
        drop(state);

        let transaction = VerificationTransaction::new(event, verdict);
        let duplicate = if first_seen { "false" } else { "true" };
        let event_kind = if transaction.is_verified() {
            Event::TransactionVerified
        } else {
            Event::TransactionRejected
        };
        log_event_with_fields(
            event_kind,
            &[
                ("duplicate", duplicate),
                ("fqin", &transaction.event.fqin),
                ("pqin", &transaction.event.pqin),
            ],
        );

        VerificationOutcome {
            transaction,
            first_seen,
            pending_children,
        }
    }

    /// Swap in a new edge set and forget every classified event.
    ///
    /// Returns the summary accumulated against the previous edge set.
    pub fn refresh(&self, edges: &EdgeSet) -> AuditSummary {
        let index = Arc::new(EdgeIndex::build(edges));
        // State lock first, then index: same order as `verify`.
        let mut state = self.lock_state();
        {
            let mut current = self.index.write().unwrap_or_else(|p| p.into_inner());
            *current = index;
        }
        let previous = std::mem::take(&mut *state);
        drop(state);

        log_event_with_fields(Event::EdgesRefreshed, &[("edges", &edges.len().to_string())]);
        previous.summary
    }

    pub fn summary(&self) -> AuditSummary {
        self.lock_state().summary
    }

    fn current_index(&self) -> Arc<EdgeIndex> {
        Arc::clone(&self.index.read().unwrap_or_else(|p| p.into_inner()))
    }

    fn lock_state(&self) -> MutexGuard<'_, VerifierState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Warn when a fat manifest is verified before all of its children.
/// Returns the number of children still pending.
fn check_children(index: &EdgeIndex, state: &VerifierState, event: &RegistryEvent) -> usize {
    let Some(expected) = index
        .children
        .get(&(event.path.clone(), event.digest.clone()))
    else {
        return 0;
    };

    let pending = expected
        .iter()
        .filter(|child| {
            !state
                .verified_children
                .contains(&(event.path.clone(), (*child).clone()))
        })
        .count();

    if pending > 0 {
        log_event_with_fields(
            Event::FatManifestChildrenPending,
            &[
                ("expected", &expected.len().to_string()),
                ("fqin", &event.fqin),
                ("pending", &pending.to_string()),
            ],
        );
    }
    pending
}
