use napi::Result as NapiResult;
use napi_derive::napi;

use proforma_core::AnalysisSettings;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Settings from an optional JSON string; missing fields take defaults.
fn settings_from(settings_json: Option<String>) -> NapiResult<AnalysisSettings> {
    let settings = match settings_json {
        Some(json) => serde_json::from_str::<AnalysisSettings>(&json).map_err(to_napi_error)?,
        None => AnalysisSettings::default(),
    };
    settings.validate().map_err(to_napi_error)?;
    Ok(settings)
}

// ---------------------------------------------------------------------------
// Income and operating
// ---------------------------------------------------------------------------

#[napi]
pub fn analyze_income(input_json: String) -> NapiResult<String> {
    let input: proforma_core::operating::income::IncomeInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        proforma_core::operating::income::analyze_income(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn compute_operating_expenses(
    input_json: String,
    settings_json: Option<String>,
) -> NapiResult<String> {
    let settings = settings_from(settings_json)?;
    let input: proforma_core::operating::expenses::OperatingInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = proforma_core::operating::expenses::compute_operating_expenses(&input, &settings)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Debt
// ---------------------------------------------------------------------------

#[napi]
pub fn build_amortization(input_json: String) -> NapiResult<String> {
    let input: proforma_core::debt::amortization::AmortizationInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        proforma_core::debt::amortization::build_amortization(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Returns
// ---------------------------------------------------------------------------

#[napi]
pub fn analyze_returns(input_json: String, settings_json: Option<String>) -> NapiResult<String> {
    let settings = settings_from(settings_json)?;
    let input: proforma_core::deal::DealAnalysisInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = proforma_core::returns::metrics::analyze_returns(&input, &settings)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn project_pro_forma(input_json: String, settings_json: Option<String>) -> NapiResult<String> {
    let settings = settings_from(settings_json)?;
    let input: proforma_core::deal::DealAnalysisInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = proforma_core::returns::projection::project_pro_forma(&input, &settings)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

#[napi]
pub fn run_sensitivity_sweep(input_json: String) -> NapiResult<String> {
    let input: proforma_core::analysis::sensitivity::SensitivityInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = proforma_core::analysis::sensitivity::run_sensitivity_sweep(&input)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn compare_to_benchmarks(input_json: String) -> NapiResult<String> {
    let input: proforma_core::analysis::benchmarks::BenchmarkInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = proforma_core::analysis::benchmarks::compare_to_benchmarks(&input)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn analyze_break_even(input_json: String, settings_json: Option<String>) -> NapiResult<String> {
    let settings = settings_from(settings_json)?;
    let input: proforma_core::deal::DealAnalysisInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = proforma_core::analysis::break_even::analyze_break_even(&input, &settings)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Risk
// ---------------------------------------------------------------------------

#[napi]
pub fn calculate_risk_score(
    input_json: String,
    settings_json: Option<String>,
) -> NapiResult<String> {
    let settings = settings_from(settings_json)?;
    let input: proforma_core::risk::scoring::RiskScoreInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = proforma_core::risk::scoring::calculate_risk_score(&input, &settings)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Refinance and tax
// ---------------------------------------------------------------------------

#[napi]
pub fn compare_refinance(input_json: String, settings_json: Option<String>) -> NapiResult<String> {
    let settings = settings_from(settings_json)?;
    let input: proforma_core::refinance::comparator::RefinanceInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = proforma_core::refinance::comparator::compare_refinance(&input, &settings)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn compute_tax_impact(input_json: String, settings_json: Option<String>) -> NapiResult<String> {
    let settings = settings_from(settings_json)?;
    let input: proforma_core::tax::impact::TaxImpactInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = proforma_core::tax::impact::compute_tax_impact(&input, &settings)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// One-shot
// ---------------------------------------------------------------------------

#[napi]
pub fn analyze_deal(input_json: String, settings_json: Option<String>) -> NapiResult<String> {
    let settings = settings_from(settings_json)?;
    let request: proforma_core::deal::DealAnalysisRequest =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        proforma_core::deal::analyze_deal(&request, &settings).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
