mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::reference::{JurisdictionsArgs, TreatyArgs};
use commands::report::ReportArgs;

/// Multi-jurisdiction portfolio tax obligations
#[derive(Parser)]
#[command(
    name = "ptax",
    version,
    about = "Multi-jurisdiction portfolio tax obligations",
    long_about = "Computes dividend withholding, source-country capital gains tax and \
                  home-country capital gains tax for a portfolio, applying bilateral \
                  treaty rates where they exist."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log engine decisions to stderr (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the tax report for a portfolio
    Report(ReportArgs),
    /// List the jurisdiction profiles in the reference data
    Jurisdictions(JurisdictionsArgs),
    /// Resolve withholding terms for a residence/domicile pair
    Treaty(TreatyArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Report(args) => commands::report::run_report(args),
        Commands::Jurisdictions(args) => commands::reference::run_jurisdictions(args),
        Commands::Treaty(args) => commands::reference::run_treaty(args),
        Commands::Version => {
            println!("ptax {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
