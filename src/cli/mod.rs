// Keystrata — CLI Module
//
// Command-line interface using clap derive macros.
// Subcommands: replay, types.

mod commands;
mod report;
mod script;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::execute;
pub use report::{HistoryReport, StateReport};
pub use script::{Script, Step};

/// Keystrata — undo/redo history for keystores.
#[derive(Parser, Debug)]
#[command(name = "keystrata")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a JSON script of keystore edits and undo/redo steps against an
    /// in-memory keystore, then print the resulting history.
    Replay {
        /// Path to the JSON script.
        script: PathBuf,

        /// Print the final history as JSON instead of a table.
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// List the supported keystore types and their capabilities.
    Types,
}
