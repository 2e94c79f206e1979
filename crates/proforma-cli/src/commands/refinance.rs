use clap::Args;
use serde_json::Value;

use proforma_core::refinance::comparator::{self, RefinanceInput};
use proforma_core::settings::AnalysisSettings;

use crate::input;

/// Arguments for refinance comparison
#[derive(Args)]
pub struct RefinanceArgs {
    /// Path to JSON/YAML input file
    #[arg(long)]
    pub input: Option<String>,

    /// Override the borrower's credit score
    #[arg(long)]
    pub credit_score: Option<u32>,
}

pub fn run_refinance(
    args: RefinanceArgs,
    settings: &AnalysisSettings,
) -> Result<Value, Box<dyn std::error::Error>> {
    let mut refinance_input: RefinanceInput = input::read_input(args.input.as_deref())?;
    if let Some(score) = args.credit_score {
        refinance_input.credit_score = score;
    }
    let result = comparator::compare_refinance(&refinance_input, settings)?;
    Ok(serde_json::to_value(result)?)
}
