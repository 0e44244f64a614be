use crate::config::Config;
use crate::github::CheckSuiteEvent;
use crate::smtp;
use anyhow::{anyhow, Result};

pub trait Notifier {
    type Event;
    fn notify(&mut self, event: &Self::Event) -> Result<()>;
}

/// The facts about one failed check suite that end up in the mail.
#[derive(Debug, PartialEq)]
pub struct CheckFailure {
    pub app_name: String,
    pub repo_name: String,
    pub repo_url: String,
    pub branch: String,
    pub sha: String,
}

impl CheckFailure {
    /// Extracts the notification facts from an event the filter has already
    /// cleared. A payload missing the repository object at this point is
    /// malformed and aborts the run.
    pub fn from_event(event: &CheckSuiteEvent, app_name: &str) -> Result<CheckFailure> {
        let suite = event
            .check_suite
            .as_ref()
            .ok_or_else(|| anyhow!("event payload has no check_suite"))?;
        let repo = event
            .repository
            .as_ref()
            .ok_or_else(|| anyhow!("event payload has no repository"))?;

        Ok(CheckFailure {
            app_name: app_name.to_owned(),
            repo_name: repo.name.clone(),
            repo_url: repo.html_url.clone(),
            branch: suite.head_branch.clone(),
            sha: suite.head_sha.clone(),
        })
    }

    pub fn commit_url(&self) -> String {
        format!("{}/commit/{}", self.repo_url, self.sha)
    }

    pub fn short_sha(&self) -> &str {
        &self.sha[..self.sha.len().min(8)]
    }
}

#[derive(Debug, PartialEq)]
pub struct NotificationMessage {
    pub subject: String,
    pub body: String,
    pub from: String,
    pub to: String,
}

impl NotificationMessage {
    pub fn compose(failure: &CheckFailure, from: &str, to: &str) -> NotificationMessage {
        let subject = format!(
            "[ci/{}] {}: Failed ({} - {})",
            failure.repo_name,
            failure.app_name,
            failure.branch,
            failure.short_sha()
        );
        let body = format!(
            "\nUnsuccessful result from CI:\n\n    repo: {}\n    branch: {}\n    commit: {}\n",
            failure.repo_url,
            failure.branch,
            failure.commit_url()
        );
        NotificationMessage {
            subject,
            body,
            from: from.to_owned(),
            to: to.to_owned(),
        }
    }
}

pub struct MailNotifier {
    config: Config,
}

impl MailNotifier {
    pub fn new(config: Config) -> Self {
        MailNotifier { config }
    }
}

impl Notifier for MailNotifier {
    type Event = CheckFailure;

    fn notify(&mut self, failure: &Self::Event) -> Result<()> {
        let message =
            NotificationMessage::compose(failure, &self.config.mail_from, &self.config.mail_to);
        smtp::send(&self.config.smtp, &message)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    extern crate pretty_assertions;

    use super::*;
    use crate::github::{App, CheckSuite, Repository};
    use pretty_assertions::assert_eq;

    fn acme_failure() -> CheckFailure {
        CheckFailure {
            app_name: "MyCI".to_owned(),
            repo_name: "acme".to_owned(),
            repo_url: "https://github.com/org/acme".to_owned(),
            branch: "main".to_owned(),
            sha: "abcdef1234567890".to_owned(),
        }
    }

    #[test]
    fn composes_the_subject_line() {
        let message = NotificationMessage::compose(&acme_failure(), "ci@example.com", "dev@example.com");

        assert_eq!(message.subject, "[ci/acme] MyCI: Failed (main - abcdef12)")
    }

    #[test]
    fn body_embeds_repo_branch_and_commit_url() {
        let message = NotificationMessage::compose(&acme_failure(), "ci@example.com", "dev@example.com");

        assert!(message.body.contains("repo: https://github.com/org/acme"));
        assert!(message.body.contains("branch: main"));
        assert!(message
            .body
            .contains("commit: https://github.com/org/acme/commit/abcdef1234567890"))
    }

    #[test]
    fn short_sha_tolerates_a_short_head_sha() {
        let mut failure = acme_failure();
        failure.sha = "abc".to_owned();

        assert_eq!(failure.short_sha(), "abc")
    }

    #[test]
    fn extracts_failure_facts_from_an_event() {
        let event = CheckSuiteEvent {
            action: Some("completed".to_owned()),
            check_suite: Some(CheckSuite {
                app: App {
                    name: "MyCI".to_owned(),
                },
                pull_requests: vec![],
                conclusion: Some("failure".to_owned()),
                head_branch: "main".to_owned(),
                head_sha: "abcdef1234567890".to_owned(),
            }),
            repository: Some(Repository {
                name: "acme".to_owned(),
                html_url: "https://github.com/org/acme".to_owned(),
            }),
        };

        assert_eq!(CheckFailure::from_event(&event, "MyCI").unwrap(), acme_failure())
    }

    #[test]
    fn rejects_an_event_without_a_repository() {
        let event = CheckSuiteEvent {
            action: Some("completed".to_owned()),
            check_suite: Some(CheckSuite {
                app: App {
                    name: "MyCI".to_owned(),
                },
                pull_requests: vec![],
                conclusion: Some("failure".to_owned()),
                head_branch: "main".to_owned(),
                head_sha: "abcdef1234567890".to_owned(),
            }),
            repository: None,
        };

        assert!(CheckFailure::from_event(&event, "MyCI").is_err())
    }
}
