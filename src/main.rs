use checkmail::config::Config;
use checkmail::filter::{self, Decision};
use checkmail::github::CheckSuiteEvent;
use checkmail::notify::{CheckFailure, MailNotifier, Notifier};

use log::{error, info};
use std::process;

fn main() {
    // The CI log viewer orders stderr badly, so everything goes to stdout.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stdout)
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            for problem in &err.problems {
                error!("Error: {}", problem);
            }
            error!("Error: {}", err);
            process::exit(1);
        }
    };

    if let Err(err) = run(config) {
        error!("Error: {:#}", err);
        process::exit(1);
    }
}

fn run(config: Config) -> anyhow::Result<()> {
    let event = CheckSuiteEvent::from_file(&config.event_path)?;

    match filter::evaluate(&event, &config.ci_app_name) {
        Decision::Skip(reason) => {
            info!("{}", reason);
            return Ok(());
        }
        Decision::Notify => {}
    }

    info!(
        "Sending email for unsuccessful check_suite \"{}\"...",
        config.ci_app_name
    );

    let failure = CheckFailure::from_event(&event, &config.ci_app_name)?;
    let mut notifier = MailNotifier::new(config);
    notifier.notify(&failure)
}
