// Keystrata — Application Entry Point
//
// Parses CLI arguments, initializes structured logging (with a filter that
// never emits secret values), and dispatches to the command handler.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use keystrata::cli::{execute, Cli};

fn main() {
    // RUST_LOG=keystrata=debug for verbose output. Logs go to stderr so that
    // `replay --json` output stays machine readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("keystrata=info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = execute(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
