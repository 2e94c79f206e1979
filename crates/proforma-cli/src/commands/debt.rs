use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use proforma_core::debt::amortization::{self, AmortizationInput};
use proforma_core::types::LoanTerms;

use crate::input;

/// Arguments for loan amortization
#[derive(Args)]
pub struct AmortizeArgs {
    /// Path to JSON/YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Amount financed
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Annual interest rate in percent (6.5 = 6.5%)
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// Amortization term in years
    #[arg(long, default_value_t = 30)]
    pub years: u32,
}

pub fn run_amortize(args: AmortizeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let amortization_input: AmortizationInput =
        match input::try_read_input(args.input.as_deref())? {
            Some(parsed) => parsed,
            None => {
                let principal = args
                    .principal
                    .ok_or("--principal is required (or provide --input)")?;
                let rate = args.rate.ok_or("--rate is required (or provide --input)")?;
                AmortizationInput {
                    principal,
                    terms: LoanTerms {
                        annual_interest_rate: rate,
                        monthly_payment: None,
                        amortization_years: Some(args.years),
                    },
                }
            }
        };

    let result = amortization::build_amortization(&amortization_input)?;
    Ok(serde_json::to_value(result)?)
}
