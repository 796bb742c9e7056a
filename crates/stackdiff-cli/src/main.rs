//! stackdiff CLI
//!
//! Compares a base and a head synthesized assembly and reports the changes

use clap::{Parser, Subcommand, ValueEnum};
use stackdiff_core::logging_facility::{init, Profile};

mod commands;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "stackdiff")]
#[command(about = "stackdiff - Infrastructure assembly change reports", long_about = None)]
struct Cli {
    /// Log output format (logs go to stderr)
    #[arg(long, value_enum, default_value = "pretty", env = "STACKDIFF_LOG_FORMAT", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Diff every head stack against base and publish the report
    Diff(commands::diff::DiffArgs),
    /// Reconcile one assembly and print its normalized manifest
    Manifest(commands::manifest::ManifestArgs),
}

fn main() {
    let cli = Cli::parse();

    init(match cli.log_format {
        LogFormat::Pretty => Profile::Development,
        LogFormat::Json => Profile::Production,
    });

    let result = match cli.command {
        Commands::Diff(args) => commands::diff::execute(args),
        Commands::Manifest(args) => commands::manifest::execute(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
