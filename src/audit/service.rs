//! Audit service
//!
//! Drives an `AuditVerifier` from a channel of raw notification payloads.
//! On shutdown the channel is closed to new events, payloads already
//! buffered are still classified, and the log is synced before returning.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use super::errors::{AuditError, AuditResult};
use super::event::RegistryEvent;
use super::log::TransactionLog;
use super::verifier::{AuditSummary, AuditVerifier};
use crate::observability::{log_event, log_event_with_fields, Event};

pub struct AuditService {
    verifier: Arc<AuditVerifier>,
    log: Arc<dyn TransactionLog>,
}

impl AuditService {
    pub fn new(verifier: Arc<AuditVerifier>, log: Arc<dyn TransactionLog>) -> Self {
        Self { verifier, log }
    }

    pub fn verifier(&self) -> &Arc<AuditVerifier> {
        &self.verifier
    }

    /// Consume payloads until the sender side closes or `shutdown` flips to
    /// true. Returns the summary for the current edge set.
    ///
    /// A malformed payload is logged and skipped. A failed log write stops
    /// the service.
    pub async fn run(
        &self,
        mut events: mpsc::Receiver<Vec<u8>>,
        mut shutdown: watch::Receiver<bool>,
    ) -> AuditResult<AuditSummary> {
        log_event(Event::AuditStarted);

        if !*shutdown.borrow() {
            loop {
                tokio::select! {
                    biased;
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                    payload = events.recv() => match payload {
                        Some(payload) => self.handle(&payload)?,
                        None => break,
                    },
                }
            }
        }

        // Stop accepting, then drain what was already accepted.
        events.close();
        while let Some(payload) = events.recv().await {
            self.handle(&payload)?;
        }

        self.log
            .sync()
            .map_err(|e| AuditError::LogWrite(e.to_string()))?;

        let summary = self.verifier.summary();
        log_event_with_fields(
            Event::AuditShutdown,
            &[
                ("rejected", &summary.rejected.to_string()),
                ("verified", &summary.verified.to_string()),
            ],
        );
        Ok(summary)
    }

    /// Parse, classify and record one payload.
    pub fn handle(&self, payload: &[u8]) -> AuditResult<()> {
        let event = match RegistryEvent::parse(payload) {
            Ok(event) => event,
            Err(e) => {
                log_event_with_fields(
                    Event::EventMalformed,
                    &[("code", e.code()), ("error", &e.to_string())],
                );
                return Ok(());
            }
        };

        let outcome = self.verifier.verify(event);
        if let Err(e) = self.log.append(&outcome.transaction) {
            let err = AuditError::LogWrite(e.to_string());
            log_event_with_fields(
                Event::TransactionLogFailed,
                &[("error", &err.to_string()), ("fqin", &outcome.transaction.event.fqin)],
            );
            return Err(err);
        }
        Ok(())
    }
}
