//! Registry audit
//!
//! Classifies observed registry mutations as agreeing or disagreeing with
//! the promotion edge set derived from the current manifests, and records
//! every classification in an append-only transaction log.
//!
//! ```text
//! payload -> RegistryEvent::parse -> AuditVerifier::verify -> TransactionLog
//! ```

mod errors;
mod event;
mod log;
mod service;
mod transaction;
mod verifier;

pub use errors::{AuditError, AuditResult};
pub use event::{Action, RegistryEvent};
pub use log::{FileTransactionLog, MemoryTransactionLog, StdoutTransactionLog, TransactionLog};
pub use service::AuditService;
pub use transaction::{Verdict, VerificationTransaction};
pub use verifier::{AuditSummary, AuditVerifier, VerificationOutcome};
