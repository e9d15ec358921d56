//! Command-line interface implementation.

use crate::gate::MasterGate;
use crate::interactive::{self, InteractiveShell, TerminalPrompter};
use crate::store::{EntryStore, DATA_FILE_NAME};
use anyhow::Context;
use clap::{ArgAction, Parser};
use std::io;
use std::path::PathBuf;
use tracing::info;

/// Single-user password book with an interactive menu.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory holding the data file
    #[arg(
        short = 'd',
        long,
        env = "PASSBOOK_DIR",
        help = "Directory holding passbook.json (default: platform data dir)"
    )]
    pub dir: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Resolve the data file path.
    pub fn data_file(&self) -> PathBuf {
        let dir = self.dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|d| d.join("passbook"))
                .unwrap_or_else(|| PathBuf::from("."))
        });
        dir.join(DATA_FILE_NAME)
    }

    /// Log level used when `RUST_LOG` is not set.
    pub fn default_log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }

    /// Open the store, pass the master password gate and run the menu.
    pub fn execute(&self) -> anyhow::Result<()> {
        let path = self.data_file();
        let store = EntryStore::open(&path)
            .with_context(|| format!("Failed to open password book at {}", path.display()))?;
        info!(path = %store.path().display(), "using data file");

        let mut prompter = TerminalPrompter::default();
        let mut gate = MasterGate::new(store);
        interactive::unlock_gate(&mut gate, &mut prompter, &mut io::stdout())?;

        let mut shell = InteractiveShell::new(gate.into_store()?, prompter, io::stdout());
        let outcome = shell.run();

        // The store is flushed even when the loop ended with an error.
        let closed = shell.into_store().close();
        if let Err(e) = &closed {
            interactive::report_error(e);
        }
        outcome?;
        closed?;
        Ok(())
    }
}
