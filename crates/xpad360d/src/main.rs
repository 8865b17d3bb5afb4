mod cli;
mod config;
mod daemon;
mod logging;

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use crossbeam_channel::{after, select, unbounded, Receiver};
use thiserror::Error;

use crate::cli::{Cli, Command};
use crate::config::{load_settings, ConfigError};
use crate::daemon::Daemon;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("driver error: {0}")]
    Driver(#[from] xpad360_driver::Error),
    #[error("failed to set Ctrl+C handler: {0}")]
    Signal(#[from] ctrlc::Error),
    #[error("no controller attached within {0:?}")]
    NoController(Duration),
    #[error("interrupted")]
    Interrupted,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = logging::setup(cli.verbose, cli.no_color) {
        logger_failed(&e);
        return ExitCode::FAILURE;
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::print_stderr)]
fn logger_failed(error: &log::SetLoggerError) {
    eprintln!("unable to set up logger: {error}");
}

fn run(cli: &Cli) -> Result<(), AppError> {
    let mut settings = load_settings(cli.config.as_deref())?;
    if cli.no_priority {
        settings.high_priority = false;
    }

    // Handle Ctrl+C to exit cleanly
    let (stop_tx, stop_rx) = unbounded::<()>();
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    })?;

    let daemon = Daemon::start(settings)?;
    let result = match &cli.command {
        Command::Run => daemon.run(&stop_rx),
        Command::Rumble { left, right, ms } => {
            rumble(&daemon, &stop_rx, cli.wait, *left, *right, *ms)
        }
        Command::Led { state } => daemon
            .wait_for_controller(&stop_rx, Duration::from_secs(cli.wait))
            .and_then(|_| {
                daemon
                    .controller()
                    .try_send_led_state(*state)
                    .map_err(AppError::from)
            }),
    };
    daemon.stop();
    result
}

fn rumble(
    daemon: &Daemon,
    stop: &Receiver<()>,
    wait: u64,
    left: u8,
    right: u8,
    ms: u64,
) -> Result<(), AppError> {
    daemon.wait_for_controller(stop, Duration::from_secs(wait))?;
    let controller = daemon.controller();
    controller.try_send_rumble(left, right)?;
    select! {
        recv(stop) -> _ => {},
        recv(after(Duration::from_millis(ms))) -> _ => {},
    }
    controller.try_send_rumble(0, 0)?;
    Ok(())
}
