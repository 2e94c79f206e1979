use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::deal::{prepare_deal, DealAnalysisInput};
use crate::error::ProFormaError;
use crate::returns::projection::build_projection;
use crate::settings::AnalysisSettings;
use crate::types::{
    clamp_percent, percent_of, with_metadata, ComputationOutput, Money, Percent, PropertyType,
};
use crate::ProFormaResult;

/// Straight-line recovery period for residential rental property.
pub const RESIDENTIAL_RECOVERY_YEARS: Decimal = dec!(27.5);
/// Straight-line recovery period for nonresidential real property.
pub const COMMERCIAL_RECOVERY_YEARS: Decimal = dec!(39);

fn default_land_value_percent() -> Percent {
    dec!(20)
}

fn default_recapture_rate() -> Percent {
    dec!(25)
}

fn default_capital_gains_rate() -> Percent {
    dec!(15)
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxAssumptions {
    pub marginal_tax_rate_percent: Percent,
    /// Share of the purchase allocated to non-depreciable land
    #[serde(default = "default_land_value_percent")]
    pub land_value_percent: Percent,
    /// Whether a tax loss offsets other income this year
    #[serde(default)]
    pub passive_losses_deductible: bool,
    #[serde(default = "default_recapture_rate")]
    pub recapture_rate_percent: Percent,
    #[serde(default = "default_capital_gains_rate")]
    pub capital_gains_rate_percent: Percent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxImpactInput {
    pub deal: DealAnalysisInput,
    pub tax: TaxAssumptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxYear {
    pub year: u32,
    pub noi: Money,
    pub interest: Money,
    pub depreciation: Money,
    pub taxable_income: Money,
    /// Tax owed (negative = shield actually used)
    pub tax: Money,
    pub after_tax_cash_flow: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxImpactOutput {
    pub depreciable_basis: Money,
    /// `None` for land, which does not depreciate
    pub recovery_period_years: Option<Decimal>,
    pub annual_depreciation: Money,
    pub year1_interest: Money,
    pub year1_noi: Money,
    /// NOI less interest less depreciation
    pub taxable_income: Money,
    /// taxable income x marginal rate, before the passive-loss rule
    pub tax_liability: Money,
    /// Tax actually applied to cash flow this year
    pub tax_applied: Money,
    /// Loss carried forward when passive losses are not deductible
    pub suspended_loss: Money,
    pub pre_tax_cash_flow: Money,
    pub after_tax_cash_flow: Money,
    pub after_tax_cash_on_cash: Option<Percent>,
    pub years: Vec<TaxYear>,
    pub accumulated_depreciation: Money,
    pub depreciation_recapture_tax: Money,
    /// Gain above the depreciation already recaptured
    pub capital_gain: Money,
    pub capital_gains_tax: Money,
    pub total_tax_on_sale: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Recovery period for a property class.
pub fn recovery_period(property_type: PropertyType) -> Option<Decimal> {
    match property_type {
        PropertyType::Land => None,
        p if p.is_residential() => Some(RESIDENTIAL_RECOVERY_YEARS),
        _ => Some(COMMERCIAL_RECOVERY_YEARS),
    }
}

/// Depreciation, taxable income and after-tax cash flow, with the tax due on
/// sale at the end of the holding period.
pub fn compute_tax_impact(
    input: &TaxImpactInput,
    settings: &AnalysisSettings,
) -> ProFormaResult<ComputationOutput<TaxImpactOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    tracing::debug!(
        marginal_rate = %input.tax.marginal_tax_rate_percent,
        "computing tax impact"
    );

    let deal = &input.deal.deal;
    let tax = &input.tax;
    let mut rate =
        |field: &str, value: Percent| clamp_percent(field, value, &mut warnings) / dec!(100);
    let marginal = rate("marginal_tax_rate_percent", tax.marginal_tax_rate_percent);
    let land_share = rate("land_value_percent", tax.land_value_percent);
    let recapture_rate = rate("recapture_rate_percent", tax.recapture_rate_percent);
    let gains_rate = rate("capital_gains_rate_percent", tax.capital_gains_rate_percent);

    let prepared = prepare_deal(&input.deal, settings, &mut warnings)?;
    let projection = build_projection(deal, &prepared);
    let first = projection.years.first().ok_or_else(|| {
        ProFormaError::InsufficientData("Projection produced no operating years".into())
    })?;

    let cost_basis = deal.purchase_price + deal.closing_costs + deal.rehab_costs;
    let depreciable_basis = cost_basis * (Decimal::ONE - land_share);
    let recovery_period_years = recovery_period(deal.property_type);
    let annual_depreciation = recovery_period_years
        .map(|years| depreciable_basis / years)
        .unwrap_or(Decimal::ZERO);
    if recovery_period_years.is_none() {
        warnings.push("Land does not depreciate; no depreciation deduction taken".into());
    }

    let mut years = Vec::with_capacity(projection.years.len());
    let mut accumulated_depreciation = Decimal::ZERO;
    let mut carried_loss = Decimal::ZERO;
    for y in &projection.years {
        // Straight line stops once the basis is exhausted.
        let depreciation = annual_depreciation.min(depreciable_basis - accumulated_depreciation);
        accumulated_depreciation += depreciation;

        let taxable_income = y.noi - y.interest_paid - depreciation;
        let (applied, carried) = apply_passive_rule(
            taxable_income,
            carried_loss,
            marginal,
            tax.passive_losses_deductible,
        );
        carried_loss = carried;

        years.push(TaxYear {
            year: y.year,
            noi: y.noi,
            interest: y.interest_paid,
            depreciation,
            taxable_income,
            tax: applied,
            after_tax_cash_flow: y.cash_flow - applied,
        });
    }

    let (taxable_income, tax_applied) = years
        .first()
        .map(|y| (y.taxable_income, y.tax))
        .unwrap_or_default();
    let tax_liability = taxable_income * marginal;
    let suspended_loss = if taxable_income < Decimal::ZERO && !tax.passive_losses_deductible {
        taxable_income.abs()
    } else {
        Decimal::ZERO
    };
    let pre_tax_cash_flow = first.cash_flow;
    let after_tax_cash_flow = pre_tax_cash_flow - tax_applied;

    // Sale at the end of the holding period; suspended losses release then.
    let adjusted_basis = cost_basis - accumulated_depreciation;
    let total_gain = projection.sale_price - adjusted_basis;
    let recaptured = accumulated_depreciation.min(total_gain.max(Decimal::ZERO));
    let depreciation_recapture_tax = recaptured * recapture_rate;
    let capital_gain = (total_gain - recaptured - carried_loss).max(Decimal::ZERO);
    let capital_gains_tax = capital_gain * gains_rate;
    if total_gain < Decimal::ZERO {
        warnings.push(format!(
            "Sale at {:.2} realizes a loss of {:.2}",
            projection.sale_price,
            total_gain.abs()
        ));
    }

    let output = TaxImpactOutput {
        depreciable_basis,
        recovery_period_years,
        annual_depreciation,
        year1_interest: first.interest_paid,
        year1_noi: first.noi,
        taxable_income,
        tax_liability,
        tax_applied,
        suspended_loss,
        pre_tax_cash_flow,
        after_tax_cash_flow,
        after_tax_cash_on_cash: percent_of(after_tax_cash_flow, deal.total_cash_invested()),
        years,
        accumulated_depreciation,
        depreciation_recapture_tax,
        capital_gain,
        capital_gains_tax,
        total_tax_on_sale: depreciation_recapture_tax + capital_gains_tax,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Rental Tax Impact (straight-line depreciation, passive-loss rule, recapture at sale)",
        input,
        warnings,
        elapsed,
        output,
    ))
}

/// Tax applied for one year and the passive loss carried into the next.
///
/// Non-deductible losses carry forward and offset later taxable income.
fn apply_passive_rule(
    taxable_income: Money,
    carried_loss: Money,
    marginal: Decimal,
    losses_deductible: bool,
) -> (Money, Money) {
    if losses_deductible {
        return (taxable_income * marginal, Decimal::ZERO);
    }
    if taxable_income < Decimal::ZERO {
        return (Decimal::ZERO, carried_loss + taxable_income.abs());
    }
    let used = carried_loss.min(taxable_income);
    ((taxable_income - used) * marginal, carried_loss - used)
}
