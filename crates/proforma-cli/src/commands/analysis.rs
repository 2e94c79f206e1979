use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use proforma_core::analysis::benchmarks::{self, BenchmarkInput};
use proforma_core::analysis::break_even;
use proforma_core::analysis::sensitivity::{self, SensitivityInput};
use proforma_core::deal::DealAnalysisInput;
use proforma_core::returns::metrics;
use proforma_core::settings::AnalysisSettings;
use proforma_core::types::OperatingAssumptions;

use crate::input;

/// Arguments for the operating-expense sensitivity sweep
#[derive(Args)]
pub struct SensitivityArgs {
    /// Path to JSON/YAML sensitivity input file
    #[arg(long, conflicts_with = "deal")]
    pub input: Option<String>,

    /// Derive the base cash flow from a deal file instead
    #[arg(long)]
    pub deal: Option<String>,

    /// Half-width of the sweep in percent, used with --deal
    #[arg(long, default_value = "20")]
    pub range: Decimal,

    /// Number of sweep points, used with --deal
    #[arg(long, default_value_t = 5)]
    pub steps: u32,
}

/// Arguments for the benchmark comparison
#[derive(Args)]
pub struct BenchmarksArgs {
    /// Path to JSON/YAML benchmark input file
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for break-even analysis
#[derive(Args)]
pub struct BreakEvenArgs {
    /// Path to JSON/YAML deal file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_sensitivity(
    args: SensitivityArgs,
    settings: &AnalysisSettings,
) -> Result<Value, Box<dyn std::error::Error>> {
    let sweep_input: SensitivityInput = if let Some(ref path) = args.deal {
        let deal: DealAnalysisInput = input::file::read_structured(path)?;
        let base = metrics::analyze_returns(&deal, settings)?.result;
        SensitivityInput {
            base_operating: deal.operating,
            range_percent: args.range,
            step_count: args.steps,
            base_monthly_cash_flow: base.monthly_cash_flow,
            total_cash_invested: base.total_cash_invested,
        }
    } else {
        input::read_input(args.input.as_deref())?
    };

    let result = sensitivity::run_sensitivity_sweep(&sweep_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_benchmarks(args: BenchmarksArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let raw = input::try_read_input::<Value>(args.input.as_deref())?;
    let benchmark_input: BenchmarkInput = match raw {
        // A bare set of operating percentages is compared with the residential table
        Some(value) if value.get("operating").is_none() => BenchmarkInput {
            operating: serde_json::from_value::<OperatingAssumptions>(value)?,
            property_type: None,
            benchmarks: None,
        },
        Some(value) => serde_json::from_value(value)?,
        None => return Err("--input <file.json> or stdin required".into()),
    };

    let result = benchmarks::compare_to_benchmarks(&benchmark_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_break_even(
    args: BreakEvenArgs,
    settings: &AnalysisSettings,
) -> Result<Value, Box<dyn std::error::Error>> {
    let deal: DealAnalysisInput = input::read_input(args.input.as_deref())?;
    let result = break_even::analyze_break_even(&deal, settings)?;
    Ok(serde_json::to_value(result)?)
}
