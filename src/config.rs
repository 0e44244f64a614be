use log::info;
use std::fmt::Display;
use std::{env, path::PathBuf};
use thiserror::Error;

/// Required environment variables, checked in this order so the report
/// reads the same way every run.
pub const REQUIRED_VARS: [&str; 8] = [
    "GITHUB_EVENT_PATH",
    "CI_APP_NAME",
    "SMTP_HOST",
    "SMTP_PORT",
    "SMTP_USER",
    "SMTP_PASS",
    "MAIL_FROM",
    "MAIL_TO",
];

#[derive(Debug, PartialEq)]
pub enum VarProblem {
    NotSet(String),
    Empty(String),
    NotAPort(String, String),
}

impl Display for VarProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VarProblem::NotSet(name) => write!(f, "environment variable not set: {}", name),
            VarProblem::Empty(name) => write!(f, "environment variable with no value: {}", name),
            VarProblem::NotAPort(name, value) => {
                write!(f, "environment variable {} is not a port number: {}", name, value)
            }
        }
    }
}

#[derive(Debug, PartialEq, Error)]
#[error("required environment variables are not available")]
pub struct ConfigError {
    pub problems: Vec<VarProblem>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
}

#[derive(Debug, PartialEq)]
pub struct Config {
    pub event_path: PathBuf,
    pub ci_app_name: String,
    pub smtp: SmtpConfig,
    pub mail_from: String,
    pub mail_to: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::from_lookup(|name| env::var(name).ok())
    }

    /// Checks every required variable before failing, so a single run
    /// reports all the problems rather than just the first one.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut problems = Vec::new();
        let mut values = Vec::with_capacity(REQUIRED_VARS.len());

        for name in &REQUIRED_VARS {
            match lookup(name) {
                None => problems.push(VarProblem::NotSet((*name).to_owned())),
                Some(value) if value.is_empty() => {
                    problems.push(VarProblem::Empty((*name).to_owned()))
                }
                Some(value) => {
                    info!("Found usable environment variable: {}", name);
                    values.push(value);
                }
            }
        }

        if !problems.is_empty() {
            return Err(ConfigError { problems });
        }

        // All eight lookups succeeded, in REQUIRED_VARS order.
        let mut values = values.into_iter();
        let event_path = PathBuf::from(values.next().unwrap());
        let ci_app_name = values.next().unwrap();
        let host = values.next().unwrap();
        let port_s = values.next().unwrap();
        let port = match port_s.parse::<u16>() {
            Ok(port) => port,
            Err(_) => {
                problems.push(VarProblem::NotAPort("SMTP_PORT".to_owned(), port_s));
                return Err(ConfigError { problems });
            }
        };

        Ok(Config {
            event_path,
            ci_app_name,
            smtp: SmtpConfig {
                host,
                port,
                user: values.next().unwrap(),
                pass: values.next().unwrap(),
            },
            mail_from: values.next().unwrap(),
            mail_to: values.next().unwrap(),
        })
    }
}

#[cfg(test)]
mod tests {
    extern crate pretty_assertions;

    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn full_env() -> HashMap<&'static str, &'static str> {
        vec![
            ("GITHUB_EVENT_PATH", "/github/workflow/event.json"),
            ("CI_APP_NAME", "MyCI"),
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_PORT", "587"),
            ("SMTP_USER", "ci-bot"),
            ("SMTP_PASS", "hunter2"),
            ("MAIL_FROM", "ci@example.com"),
            ("MAIL_TO", "dev@example.com"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn builds_a_config_from_a_fully_populated_environment() {
        let env = full_env();
        let config = Config::from_lookup(|k| env.get(k).map(|v| (*v).to_owned())).unwrap();

        assert_eq!(
            config,
            Config {
                event_path: PathBuf::from("/github/workflow/event.json"),
                ci_app_name: "MyCI".to_owned(),
                smtp: SmtpConfig {
                    host: "smtp.example.com".to_owned(),
                    port: 587,
                    user: "ci-bot".to_owned(),
                    pass: "hunter2".to_owned(),
                },
                mail_from: "ci@example.com".to_owned(),
                mail_to: "dev@example.com".to_owned(),
            }
        )
    }

    #[test]
    fn reports_every_missing_and_empty_variable() {
        let mut env = full_env();
        env.remove("SMTP_HOST");
        env.insert("MAIL_TO", "");

        let err = Config::from_lookup(|k| env.get(k).map(|v| (*v).to_owned())).unwrap_err();

        assert_eq!(
            err.problems,
            vec![
                VarProblem::NotSet("SMTP_HOST".to_owned()),
                VarProblem::Empty("MAIL_TO".to_owned()),
            ]
        )
    }

    #[test]
    fn rejects_a_non_numeric_port() {
        let mut env = full_env();
        env.insert("SMTP_PORT", "mail");

        let err = Config::from_lookup(|k| env.get(k).map(|v| (*v).to_owned())).unwrap_err();

        assert_eq!(
            err.problems,
            vec![VarProblem::NotAPort("SMTP_PORT".to_owned(), "mail".to_owned())]
        )
    }
}
