//! Terminal output of the daemon.
//!
//! Every record, the driver's included, is stamped with local time and
//! coloured by level. Records from other crates name their origin.

use colored::{ColoredString, Colorize};
use fern::Dispatch;
use log::{Level, LevelFilter};

const TIME_FORMAT: &str = "%Y.%m.%d %H:%M:%S";
const OWN_TARGET: &str = "xpad360d";

/// One log line without colour.
fn line(time: &str, target: &str, message: &str) -> String {
    let origin = target.split("::").next().unwrap_or(target);
    if origin == OWN_TARGET {
        format!("[{time}] {message}")
    } else {
        format!("[{time}] {origin}: {message}")
    }
}

fn paint(level: Level, line: String) -> ColoredString {
    match level {
        Level::Error => line.bright_red(),
        Level::Warn => line.bright_yellow(),
        Level::Info => line.normal(),
        Level::Debug | Level::Trace => line.dimmed(),
    }
}

/// Installs the stdout logger. The daemon and the driver follow `verbose`;
/// anything else only gets through with errors.
pub(crate) fn setup(verbose: bool, no_color: bool) -> Result<(), log::SetLoggerError> {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    if no_color {
        colored::control::set_override(false);
    }
    Dispatch::new()
        .format(|out, message, record| {
            let now = chrono::Local::now().format(TIME_FORMAT).to_string();
            let text = line(&now, record.target(), &message.to_string());
            out.finish(format_args!("{}", paint(record.level(), text)));
        })
        .level(LevelFilter::Error)
        .level_for(OWN_TARGET, level)
        .level_for("xpad360_driver", level)
        .chain(std::io::stdout())
        .apply()
}
