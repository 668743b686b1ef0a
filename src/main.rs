//! untz CLI entry point

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use untz::config::{Cli, Settings};
use untz::pipeline;

fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    init_logging(&cli);

    let settings = match Settings::from_cli(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(e.exit_code());
        }
    };

    match pipeline::run(&settings) {
        Ok(summary) => {
            println!(
                "Summary: {} encoded, {} skipped{}",
                summary.encoded,
                summary.skipped,
                if summary.gain_applied { ", gain applied" } else { "" }
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            if e.is_preflight() {
                eprintln!("Error: {}", e);
            } else {
                eprintln!("Fatal error: {}", e);
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_logging(cli: &Cli) {
    let filter = cli.log_level().as_str().to_lowercase();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
