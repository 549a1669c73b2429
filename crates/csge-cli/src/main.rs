//! Indicator loader CLI.

use clap::Parser;
use tracing::error;

use csge_cli::cli::Cli;
use csge_cli::commands::{RunSettings, run};
use csge_cli::logging::{LogSettings, init_logging};
use csge_cli::summary::print_summary;

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    if let Err(error) = init_logging(&LogSettings::from_cli(&cli)) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }

    let request = match cli.request() {
        Ok(request) => request,
        Err(error) => {
            error!("Invalid arguments: {error}");
            eprintln!("error: {error}");
            eprintln!("Run with --help for usage.");
            std::process::exit(2);
        }
    };
    let settings = RunSettings {
        config: cli.config.clone(),
        dry_run: cli.dry_run,
        min_ref_year: cli.min_ref_year,
    };
    let exit_code = match run(request, &settings) {
        Ok(result) => {
            print_summary(&result);
            if result.has_errors() { 1 } else { 0 }
        }
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    };
    std::process::exit(exit_code);
}
