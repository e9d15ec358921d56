//! Main entry point for passbook.

use clap::Parser;
use passbook::cli::Cli;
use passbook::utils::error_exit;
use tracing_subscriber::EnvFilter;

fn main() {
    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.default_log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Err(e) = cli.execute() {
        error_exit(&format!("{e:#}"), 1);
    }
}
