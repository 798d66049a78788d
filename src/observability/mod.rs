//! Observability
//!
//! Structured JSON logging over a closed event catalogue. Observability is
//! read-only: a failure to log never changes a check result or a verdict.

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity};

/// Severity an event is logged at.
pub fn severity_of(event: Event) -> Severity {
    if event.is_fatal() {
        Severity::Fatal
    } else if event.is_error() {
        Severity::Error
    } else if event.is_warning() {
        Severity::Warn
    } else {
        Severity::Info
    }
}

/// Log a lifecycle event
pub fn log_event(event: Event) {
    Logger::log(severity_of(event), event.as_str(), &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(severity_of(event), event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_mapping() {
        assert_eq!(severity_of(Event::CheckoutRestoreFailed), Severity::Fatal);
        assert_eq!(severity_of(Event::CheckFailed), Severity::Error);
        assert_eq!(severity_of(Event::TransactionRejected), Severity::Warn);
        assert_eq!(severity_of(Event::EdgesBuilt), Severity::Info);
    }

    #[test]
    fn test_log_event() {
        // Verifies no panic
        log_event(Event::AuditStarted);
        log_event_with_fields(Event::CheckPassed, &[("check", "ImageSizeCheck")]);
    }
}
