//! Consistency checks that gate a change to the manifest repository
//!
//! Each check runs once per proposed change over an already-built edge set.
//! Checks never short-circuit: a failing run reports every offending image,
//! and `run_checks` reports every failing check.

mod errors;
mod removal;
mod revision;
mod size;

pub use errors::{
    CheckError, CheckFailures, CheckResult, ImageSizeViolations, RemovedImages, SizeViolation,
};
pub use removal::{compare_edge_sets, ImageRemovalCheck};
pub use revision::{
    GitRevisionReader, GitSha, RevisionConfig, RevisionReader, SharedWorktree, BASELINE_SHA_VAR,
    CANDIDATE_SHA_VAR,
};
pub use size::ImageSizeCheck;

use crate::observability::{log_event_with_fields, Event};

/// A check run before promotion.
pub trait PreCheck {
    /// Name used in logs and aggregate errors.
    fn name(&self) -> &'static str;

    fn run(&self) -> CheckResult<()>;
}

/// Run every check in order and aggregate the failures.
pub fn run_checks(checks: &[&dyn PreCheck]) -> CheckResult<()> {
    let mut failures = Vec::new();

    for check in checks {
        let name = check.name();
        log_event_with_fields(Event::CheckStarted, &[("check", name)]);
        match check.run() {
            Ok(()) => log_event_with_fields(Event::CheckPassed, &[("check", name)]),
            Err(e) => {
                log_event_with_fields(
                    Event::CheckFailed,
                    &[("check", name), ("error", &e.to_string())],
                );
                failures.push((name, e));
            }
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(CheckError::ChecksFailed(CheckFailures { failures }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str, CheckResult<()>);

    impl PreCheck for Fixed {
        fn name(&self) -> &'static str {
            self.0
        }

        fn run(&self) -> CheckResult<()> {
            self.1.clone()
        }
    }

    #[test]
    fn test_run_checks_all_pass() {
        let a = Fixed("a", Ok(()));
        let b = Fixed("b", Ok(()));
        assert!(run_checks(&[&a, &b]).is_ok());
    }

    #[test]
    fn test_run_checks_reports_every_failure() {
        let a = Fixed("a", Err(CheckError::InvalidConfig("first".to_string())));
        let b = Fixed("b", Ok(()));
        let c = Fixed("c", Err(CheckError::InvalidConfig("second".to_string())));

        let err = run_checks(&[&a, &b, &c]).unwrap_err();
        let text = err.to_string();
        assert!(text.starts_with("2 check(s) failed"));
        assert!(text.contains("[a] Invalid check configuration: first"));
        assert!(text.contains("[c] Invalid check configuration: second"));
    }
}
