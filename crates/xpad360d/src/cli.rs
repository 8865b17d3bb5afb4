use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use xpad360_driver::LedState;

#[derive(Debug, Subcommand, PartialEq)]
pub(crate) enum Command {
    /// Run in the foreground, logging controller input.
    Run,
    /// Spin both rumble motors for a while.
    Rumble {
        /// Left (low frequency) motor power
        left: u8,
        /// Right (high frequency) motor power
        right: u8,
        /// How long to rumble, in milliseconds
        #[arg(long, default_value_t = 500)]
        ms: u64,
    },
    /// Set the ring light pattern, e.g. `top-left-on` or `rotate`.
    Led {
        state: LedState,
    },
}

/// Userspace driver for the wired Xbox 360 controller.
#[derive(Parser)]
#[command(version, about, long_about = None)]
pub(crate) struct Cli {
    /// Turn debugging information on
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// YAML file with driver settings
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Keep the poller at normal scheduling priority
    #[arg(long, global = true)]
    pub no_priority: bool,

    /// Seconds to wait for a controller in one-shot commands
    #[arg(long, global = true, default_value_t = 5)]
    pub wait: u64,

    /// The command to run
    #[clap(subcommand)]
    pub command: Command,
}
