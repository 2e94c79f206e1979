use clap::Args;
use serde_json::Value;

use proforma_core::deal::DealAnalysisInput;
use proforma_core::returns::{metrics, projection};
use proforma_core::settings::AnalysisSettings;

use crate::input;

/// Arguments for the return-metrics bundle
#[derive(Args)]
pub struct ReturnsArgs {
    /// Path to JSON/YAML deal file
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for the multi-year projection
#[derive(Args)]
pub struct ProjectionArgs {
    /// Path to JSON/YAML deal file
    #[arg(long)]
    pub input: Option<String>,

    /// Override the deal's holding period
    #[arg(long)]
    pub years: Option<u32>,
}

pub fn run_returns(
    args: ReturnsArgs,
    settings: &AnalysisSettings,
) -> Result<Value, Box<dyn std::error::Error>> {
    let deal: DealAnalysisInput = input::read_input(args.input.as_deref())?;
    let result = metrics::analyze_returns(&deal, settings)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_projection(
    args: ProjectionArgs,
    settings: &AnalysisSettings,
) -> Result<Value, Box<dyn std::error::Error>> {
    let mut deal: DealAnalysisInput = input::read_input(args.input.as_deref())?;
    if let Some(years) = args.years {
        deal.deal.holding_period_years = years;
    }
    let result = projection::project_pro_forma(&deal, settings)?;
    Ok(serde_json::to_value(result)?)
}
