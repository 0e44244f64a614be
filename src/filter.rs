use crate::github::CheckSuiteEvent;

#[derive(Debug, PartialEq)]
pub enum Decision {
    /// The event is not actionable; the reason is printed and the process
    /// exits successfully. A skip is not an error.
    Skip(String),
    Notify,
}

/// A predicate returning the skip reason when the event should not be
/// notified, or `None` to let the next check run.
type SkipCheck = fn(&CheckSuiteEvent, &str) -> Option<String>;

/// Evaluated in order; the first matching check wins. Later checks rely on
/// `not_a_check_suite` having established that `check_suite` is present.
const CHECKS: [SkipCheck; 5] = [
    not_a_check_suite,
    not_completed,
    app_name_mismatch,
    triggered_via_pull_request,
    successful_conclusion,
];

pub fn evaluate(event: &CheckSuiteEvent, ci_app_name: &str) -> Decision {
    for check in &CHECKS {
        if let Some(reason) = check(event, ci_app_name) {
            return Decision::Skip(reason);
        }
    }
    Decision::Notify
}

fn not_a_check_suite(event: &CheckSuiteEvent, _: &str) -> Option<String> {
    if event.check_suite.is_none() {
        Some("Skip processing non-check_suite action".to_owned())
    } else {
        None
    }
}

fn not_completed(event: &CheckSuiteEvent, _: &str) -> Option<String> {
    let action = event.action.as_deref().unwrap_or_default();
    if action != "completed" {
        Some(format!("Skip processing check_suite action type: {}", action))
    } else {
        None
    }
}

fn app_name_mismatch(event: &CheckSuiteEvent, ci_app_name: &str) -> Option<String> {
    let suite = event.check_suite.as_ref()?;
    if suite.app.name != ci_app_name {
        Some(format!(
            "Skip processing check_suite for app: {}",
            suite.app.name
        ))
    } else {
        None
    }
}

fn triggered_via_pull_request(event: &CheckSuiteEvent, _: &str) -> Option<String> {
    let suite = event.check_suite.as_ref()?;
    if !suite.pull_requests.is_empty() {
        Some("Skip processing check_suite triggered via Pull Request".to_owned())
    } else {
        None
    }
}

fn successful_conclusion(event: &CheckSuiteEvent, _: &str) -> Option<String> {
    let suite = event.check_suite.as_ref()?;
    // TODO: notify when the previous commit on the branch did not conclude
    // successfully, so a recovery gets a mail too.
    if suite.conclusion.as_deref() == Some("success") {
        Some("Skip processing successful check_suite".to_owned())
    } else {
        None
    }
}
