use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use proforma_core::settings::AnalysisSettings;
use proforma_core::tax::impact::{self, TaxImpactInput};

use crate::input;

/// Arguments for tax impact
#[derive(Args)]
pub struct TaxArgs {
    /// Path to JSON/YAML input file: a deal plus its tax assumptions
    #[arg(long)]
    pub input: Option<String>,

    /// Override the marginal income tax rate (percent)
    #[arg(long)]
    pub marginal_rate: Option<Decimal>,
}

pub fn run_tax(
    args: TaxArgs,
    settings: &AnalysisSettings,
) -> Result<Value, Box<dyn std::error::Error>> {
    let mut tax_input: TaxImpactInput = input::read_input(args.input.as_deref())?;
    if let Some(rate) = args.marginal_rate {
        tax_input.tax.marginal_tax_rate_percent = rate;
    }
    let result = impact::compute_tax_impact(&tax_input, settings)?;
    Ok(serde_json::to_value(result)?)
}
