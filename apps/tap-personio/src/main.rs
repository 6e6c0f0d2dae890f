//! tap-personio - Singer tap for the Personio HR API
//!
//! Discovery prints the catalog of bundled stream schemas. Sync writes
//! SCHEMA, RECORD and STATE messages to stdout; logs go to stderr.

use clap::Parser;

mod cli;
mod error;
mod logging;

#[tokio::main]
async fn main() {
    let args = cli::Args::parse();

    if let Err(e) = logging::init_logging(&args.log_level) {
        eprintln!("Error: {e}");
        std::process::exit(e.exit_code());
    }

    if let Err(e) = cli::run(args, std::io::stdout()).await {
        tracing::error!(error = %e, "tap-personio failed");
        std::process::exit(e.exit_code());
    }
}
