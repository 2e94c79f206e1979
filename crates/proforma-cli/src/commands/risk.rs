use clap::Args;
use serde_json::Value;

use proforma_core::market::{MarketConditions, MarketPreset};
use proforma_core::risk::property_age::PropertyAgeFactors;
use proforma_core::risk::scoring::{self, RiskFactors, RiskScoreInput};
use proforma_core::settings::AnalysisSettings;

use crate::input;

/// Arguments for risk scoring
#[derive(Args)]
pub struct RiskArgs {
    /// Path to JSON/YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Market volatility, 1 (calm) to 10 (volatile)
    #[arg(long)]
    pub market_volatility: Option<i32>,

    /// Tenant quality, 1 (poor) to 10 (excellent)
    #[arg(long)]
    pub tenant_quality: Option<i32>,

    /// Property condition, 1 (poor) to 10 (excellent)
    #[arg(long)]
    pub property_condition: Option<i32>,

    /// Location stability, 1 (unstable) to 10 (stable)
    #[arg(long)]
    pub location_stability: Option<i32>,

    /// Financing risk, 1 (low) to 10 (high)
    #[arg(long)]
    pub financing_risk: Option<i32>,

    /// Market preset: stable, growing, declining or volatile
    #[arg(long, default_value = "stable")]
    pub market: String,

    /// Property age in years
    #[arg(long, default_value_t = 0)]
    pub age: u32,
}

pub fn run_risk(
    args: RiskArgs,
    settings: &AnalysisSettings,
) -> Result<Value, Box<dyn std::error::Error>> {
    let risk_input: RiskScoreInput = match input::try_read_input(args.input.as_deref())? {
        Some(parsed) => parsed,
        None => {
            let required = |v: Option<i32>, flag: &str| {
                v.ok_or_else(|| format!("--{flag} is required (or provide --input)"))
            };
            let preset: MarketPreset =
                serde_json::from_value(Value::String(args.market.to_lowercase()))
                    .map_err(|_| format!("unknown market preset '{}'", args.market))?;
            RiskScoreInput {
                factors: RiskFactors {
                    market_volatility: required(args.market_volatility, "market-volatility")?,
                    tenant_quality: required(args.tenant_quality, "tenant-quality")?,
                    property_condition: required(args.property_condition, "property-condition")?,
                    location_stability: required(args.location_stability, "location-stability")?,
                    financing_risk: required(args.financing_risk, "financing-risk")?,
                },
                market: MarketConditions::from_preset(preset),
                property_age: PropertyAgeFactors::for_age(args.age),
            }
        }
    };

    let result = scoring::calculate_risk_score(&risk_input, settings)?;
    Ok(serde_json::to_value(result)?)
}
