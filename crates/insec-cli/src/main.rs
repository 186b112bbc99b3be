//! # insec
//!
//! Launches `/bin/bash` as PID 1 of fresh mount, PID, and UTS namespaces,
//! on top of a copy-on-write overlay of the host root. Exits with the
//! shell's own status.

mod cli;
mod logging;

use std::process::ExitCode;

use clap::Parser;

use crate::cli::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = logging::init(cli.verbose, cli.log_format) {
        report_fatal(&e);
        return ExitCode::from(insec_common::constants::EXIT_FAILURE);
    }
    cli::execute()
}

/// Last-resort diagnostic for when no subscriber could be installed.
#[allow(clippy::print_stderr)]
fn report_fatal(e: &anyhow::Error) {
    eprintln!("insec: {e:#}");
}
