use fs::File;
use serde::Deserialize;
use std::{fs, io::BufReader, path::Path};

/// One `check_suite` webhook delivery, read-only after load.
///
/// `action` and the two top-level objects are optional because deliveries of
/// other event kinds (which the filter skips) do not carry them; fields inside
/// `check_suite` follow the webhook schema and are required.
#[derive(Debug, PartialEq, Deserialize)]
pub struct CheckSuiteEvent {
    pub action: Option<String>,
    pub check_suite: Option<CheckSuite>,
    pub repository: Option<Repository>,
}

impl CheckSuiteEvent {
    pub fn from_file<T: AsRef<Path>>(path: T) -> anyhow::Result<CheckSuiteEvent> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let event: CheckSuiteEvent = serde_json::from_reader(reader)?;
        Ok(event)
    }
}

#[derive(Debug, PartialEq, Deserialize)]
pub struct CheckSuite {
    pub app: App,
    #[serde(default)]
    pub pull_requests: Vec<PullRequestRef>,
    pub conclusion: Option<String>,
    pub head_branch: String,
    pub head_sha: String,
}

#[derive(Debug, PartialEq, Deserialize)]
pub struct App {
    pub name: String,
}

/// Abbreviated pull request record as embedded in a check_suite payload.
#[derive(Debug, PartialEq, Deserialize)]
pub struct PullRequestRef {
    pub number: u64,
}

#[derive(Debug, PartialEq, Deserialize)]
pub struct Repository {
    pub name: String,
    pub html_url: String,
}
