//! Verification transactions
//!
//! One classified observation per registry mutation. The rendered log line
//! is matched verbatim by downstream log assertions, so field order and
//! punctuation are fixed.

use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::event::RegistryEvent;
use crate::registry::Digest;

/// Outcome of matching an event against the edge set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// A matching edge exists. `parent_digest` is set when the edge is a
    /// fat-manifest child.
    Verified { parent_digest: Option<Digest> },
    /// No edge matches.
    Rejected,
}

impl Verdict {
    pub fn is_verified(&self) -> bool {
        matches!(self, Verdict::Verified { .. })
    }
}

#[derive(Debug, Clone)]
pub struct VerificationTransaction {
    pub id: Uuid,
    pub observed_at: DateTime<Utc>,
    pub event: RegistryEvent,
    pub verdict: Verdict,
}

impl VerificationTransaction {
    pub fn new(event: RegistryEvent, verdict: Verdict) -> Self {
        Self {
            id: Uuid::new_v4(),
            observed_at: Utc::now(),
            event,
            verdict,
        }
    }

    pub fn is_verified(&self) -> bool {
        self.verdict.is_verified()
    }

    /// The transaction log line, without a trailing newline.
    pub fn to_log_line(&self) -> String {
        let event = &self.event;
        let fields = format!(
            "{{Action: \"{}\", FQIN: \"{}\", PQIN: \"{}\", Path: \"{}\", Digest: \"{}\", Tag: \"{}\"}}",
            event.action,
            event.fqin,
            event.pqin,
            event.path,
            event.digest,
            event.tag_str()
        );

        match &self.verdict {
            Verdict::Verified {
                parent_digest: Some(parent),
            } => format!(
                "TRANSACTION VERIFIED: {}: agrees with manifest (parent digest {})",
                fields, parent
            ),
            Verdict::Verified {
                parent_digest: None,
            } => format!("TRANSACTION VERIFIED: {}: agrees with manifest", fields),
            Verdict::Rejected => format!("TRANSACTION REJECTED: {}: could not validate", fields),
        }
    }
}

impl fmt::Display for VerificationTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_log_line())
    }
}
