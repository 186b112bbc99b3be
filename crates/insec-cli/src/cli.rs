//! Command-line definition and dispatch.

use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use insec_common::config::LaunchConfig;
use insec_common::constants::EXIT_FAILURE;
use insec_runtime::supervisor::Supervisor;

/// insec — run a shell in an isolated, throwaway copy of this machine.
///
/// Changes the shell makes to files are kept in a private scratch layer
/// and discarded on exit. Requires root.
#[derive(Parser, Debug)]
#[command(name = "insec", version, about, long_about)]
pub struct Cli {
    /// Increase log verbosity (-v for info, -vv for debug). `RUST_LOG` wins.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Format of diagnostic output on stderr.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, env = "INSEC_LOG_FORMAT")]
    pub log_format: LogFormat,
}

/// Diagnostic output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

/// Runs the launch and maps its result onto the process exit status.
///
/// The shell's exit code is propagated unchanged; any supervisor error
/// is logged and reported as the generic failure status.
pub fn execute() -> ExitCode {
    match Supervisor::new(LaunchConfig::default()).run() {
        Ok(outcome) => ExitCode::from(outcome.exit_code()),
        Err(e) => {
            tracing::error!(error = %e, "launch failed");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}
