//! Observable events
//!
//! Closed set of event names emitted by the promoter gate and the auditor.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Manifests and edges
    /// Manifests discovered and parsed
    ManifestsLoaded,
    /// Promotion edge set computed
    EdgesBuilt,

    // Checks
    CheckStarted,
    CheckPassed,
    /// Policy violation or collaborator failure
    CheckFailed,
    /// Check left out for lack of input
    CheckSkipped,
    /// Working tree moved to the baseline revision
    CheckoutStarted,
    /// Working tree back on the candidate revision
    CheckoutRestored,
    /// Working tree could not be restored (FATAL)
    CheckoutRestoreFailed,

    // Audit
    AuditStarted,
    AuditShutdown,
    TransactionVerified,
    TransactionRejected,
    /// Payload rejected at ingestion
    EventMalformed,
    /// Parent verified before all of its children
    FatManifestChildrenPending,
    /// Edge set swapped for a new manifest
    EdgesRefreshed,
    /// Transaction could not be appended to the log
    TransactionLogFailed,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ManifestsLoaded => "MANIFESTS_LOADED",
            Event::EdgesBuilt => "EDGES_BUILT",
            Event::CheckStarted => "CHECK_STARTED",
            Event::CheckPassed => "CHECK_PASSED",
            Event::CheckFailed => "CHECK_FAILED",
            Event::CheckSkipped => "CHECK_SKIPPED",
            Event::CheckoutStarted => "CHECKOUT_STARTED",
            Event::CheckoutRestored => "CHECKOUT_RESTORED",
            Event::CheckoutRestoreFailed => "CHECKOUT_RESTORE_FAILED",
            Event::AuditStarted => "AUDIT_STARTED",
            Event::AuditShutdown => "AUDIT_SHUTDOWN",
            Event::TransactionVerified => "TRANSACTION_VERIFIED",
            Event::TransactionRejected => "TRANSACTION_REJECTED",
            Event::EventMalformed => "EVENT_MALFORMED",
            Event::FatManifestChildrenPending => "FAT_MANIFEST_CHILDREN_PENDING",
            Event::EdgesRefreshed => "EDGES_REFRESHED",
            Event::TransactionLogFailed => "TRANSACTION_LOG_FAILED",
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::CheckoutRestoreFailed)
    }

    /// Events that describe a failure but not a fatal one.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Event::CheckFailed | Event::TransactionLogFailed
        )
    }

    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Event::CheckSkipped
                | Event::TransactionRejected
                | Event::EventMalformed
                | Event::FatManifestChildrenPending
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
