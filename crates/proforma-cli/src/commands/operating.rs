use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use proforma_core::operating::expenses::{self, OperatingInput};
use proforma_core::operating::income::{self, IncomeInput, IncomeSource};
use proforma_core::settings::AnalysisSettings;

use crate::input;

/// Arguments for monthly income
#[derive(Args)]
pub struct IncomeArgs {
    /// Path to JSON/YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Flat monthly income for long-term rentals
    #[arg(long)]
    pub monthly_income: Option<Decimal>,
}

/// Arguments for the operating statement
#[derive(Args)]
pub struct OperatingArgs {
    /// Path to JSON/YAML input file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_income(args: IncomeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let income_input: IncomeInput = match input::try_read_input(args.input.as_deref())? {
        Some(parsed) => parsed,
        None => {
            let monthly = args
                .monthly_income
                .ok_or("--monthly-income is required (or provide --input)")?;
            IncomeInput {
                source: IncomeSource::flat(monthly),
                operation_type: Default::default(),
                property_type: Default::default(),
            }
        }
    };

    let result = income::analyze_income(&income_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_operating(
    args: OperatingArgs,
    settings: &AnalysisSettings,
) -> Result<Value, Box<dyn std::error::Error>> {
    let operating_input: OperatingInput = input::read_input(args.input.as_deref())?;
    let result = expenses::compute_operating_expenses(&operating_input, settings)?;
    Ok(serde_json::to_value(result)?)
}
