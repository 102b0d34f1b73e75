mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::RecordArgs;

/// Intrinsic-value estimates for public equities
#[derive(Parser)]
#[command(
    name = "eqv",
    version,
    about = "Intrinsic-value estimates for public equities",
    long_about = "Computes intrinsic-value estimates from a normalized \
                  financial-statement record: multi-scenario DCF, Graham \
                  number, the Graham defensive screen, and a composite \
                  verdict with confidence scoring."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full valuation: DCF + Graham + composite verdict
    Value(RecordArgs),
    /// Calculate WACC from CAPM and the coverage-based credit spread
    Wacc(RecordArgs),
    /// Run the three-scenario DCF with sensitivity analysis
    Dcf(RecordArgs),
    /// Calculate the Graham number
    GrahamNumber(RecordArgs),
    /// Evaluate the seven-criterion defensive screen
    Screen(RecordArgs),
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

fn main() {
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Value(args) => commands::valuation::run_value(args),
        Commands::Wacc(args) => commands::valuation::run_wacc(args),
        Commands::Dcf(args) => commands::valuation::run_dcf(args),
        Commands::GrahamNumber(args) => commands::graham::run_graham_number(args),
        Commands::Screen(args) => commands::graham::run_screen(args),
        Commands::Version => {
            println!("eqv {}", env!("CARGO_PKG_VERSION"));
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
