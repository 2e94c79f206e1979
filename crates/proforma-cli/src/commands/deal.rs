use clap::Args;
use serde_json::Value;

use proforma_core::deal::{self, DealAnalysisRequest};
use proforma_core::settings::AnalysisSettings;

use crate::input;

/// Arguments for one-shot deal analysis
#[derive(Args)]
pub struct AnalyzeArgs {
    /// Path to JSON/YAML deal file, optionally with a "risk" section
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_analyze(
    args: AnalyzeArgs,
    settings: &AnalysisSettings,
) -> Result<Value, Box<dyn std::error::Error>> {
    let request: DealAnalysisRequest = input::read_input(args.input.as_deref())?;
    let result = deal::analyze_deal(&request, settings)?;
    Ok(serde_json::to_value(result)?)
}
