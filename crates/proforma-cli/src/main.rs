mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::analysis::{BenchmarksArgs, BreakEvenArgs, SensitivityArgs};
use commands::deal::AnalyzeArgs;
use commands::debt::AmortizeArgs;
use commands::operating::{IncomeArgs, OperatingArgs};
use commands::refinance::RefinanceArgs;
use commands::returns::{ProjectionArgs, ReturnsArgs};
use commands::risk::RiskArgs;
use commands::tax::TaxArgs;

/// Real-estate deal analysis and pro forma calculations
#[derive(Parser)]
#[command(
    name = "proforma",
    version,
    about = "Real-estate deal analysis and pro forma calculations",
    long_about = "A CLI for underwriting real-estate deals with decimal precision. \
                  Covers income and operating statements, loan amortization, return \
                  metrics, multi-year projections, sensitivity and benchmark analysis, \
                  risk scoring, refinance comparison and tax impact."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Analysis settings file (JSON or YAML); defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<String>,

    /// Log calculation steps to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Monthly income with seasonal breakdown
    Income(IncomeArgs),
    /// Operating statement: income, expenses and NOI
    Operating(OperatingArgs),
    /// Loan payment and yearly amortization schedule
    Amortize(AmortizeArgs),
    /// Full return-metrics bundle for a deal
    Returns(ReturnsArgs),
    /// Year-by-year pro forma over the holding period
    Projection(ProjectionArgs),
    /// Sweep operating percentages and report cash-flow impact
    Sensitivity(SensitivityArgs),
    /// Compare operating percentages with industry benchmarks
    Benchmarks(BenchmarksArgs),
    /// Break-even occupancy, income and ADR
    BreakEven(BreakEvenArgs),
    /// Weighted risk score with recommendations
    Risk(RiskArgs),
    /// Compare a refinance candidate with the current loan
    Refinance(RefinanceArgs),
    /// Depreciation, taxable income and tax at sale
    Tax(TaxArgs),
    /// One-shot deal analysis: statement, debt, metrics and optional risk
    Analyze(AnalyzeArgs),
    /// Print version information
    Version,
}

#[derive(Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("proforma=debug,proforma_core=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = match input::load_settings(cli.config.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    };

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Income(args) => commands::operating::run_income(args),
        Commands::Operating(args) => commands::operating::run_operating(args, &settings),
        Commands::Amortize(args) => commands::debt::run_amortize(args),
        Commands::Returns(args) => commands::returns::run_returns(args, &settings),
        Commands::Projection(args) => commands::returns::run_projection(args, &settings),
        Commands::Sensitivity(args) => commands::analysis::run_sensitivity(args, &settings),
        Commands::Benchmarks(args) => commands::analysis::run_benchmarks(args),
        Commands::BreakEven(args) => commands::analysis::run_break_even(args, &settings),
        Commands::Risk(args) => commands::risk::run_risk(args, &settings),
        Commands::Refinance(args) => commands::refinance::run_refinance(args, &settings),
        Commands::Tax(args) => commands::tax::run_tax(args, &settings),
        Commands::Analyze(args) => commands::deal::run_analyze(args, &settings),
        Commands::Version => {
            println!("proforma {}", env!("CARGO_PKG_VERSION"));
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
