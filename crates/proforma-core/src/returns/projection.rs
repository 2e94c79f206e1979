use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::deal::{prepare_deal, DealAnalysisInput, PreparedDeal};
use crate::debt::amortization::payment_split;
use crate::settings::AnalysisSettings;
use crate::types::{with_metadata, ComputationOutput, DealInputs, Money, Percent};
use crate::ProFormaResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One projected operating year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionYear {
    pub year: u32,
    pub gross_income: Money,
    pub operating_expenses: Money,
    pub noi: Money,
    pub debt_service: Money,
    pub interest_paid: Money,
    pub principal_paid: Money,
    /// NOI less debt service
    pub cash_flow: Money,
    /// Loan balance at year end
    pub loan_balance: Money,
    /// Appreciated value at year end
    pub property_value: Money,
    pub equity: Money,
}

/// Growth rates after market adjustment, in percent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveGrowth {
    pub rent_growth: Percent,
    pub expense_growth: Percent,
    pub appreciation: Percent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionOutput {
    pub growth: EffectiveGrowth,
    pub years: Vec<ProjectionYear>,
    /// Value at the end of the holding period
    pub sale_price: Money,
    /// Sale price less the loan payoff
    pub net_sale_proceeds: Money,
    /// Year-0 outlay then yearly NOI; sale price added to the last year
    pub unlevered_cash_flows: Vec<Money>,
    /// Year-0 equity then yearly cash flow; net proceeds added to the last year
    pub levered_cash_flows: Vec<Money>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Year-by-year pro forma over the deal's holding period.
pub fn project_pro_forma(
    input: &DealAnalysisInput,
    settings: &AnalysisSettings,
) -> ProFormaResult<ComputationOutput<ProjectionOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    tracing::debug!(years = input.deal.holding_period_years, "projecting pro forma");

    let prepared = prepare_deal(input, settings, &mut warnings)?;
    let output = build_projection(&input.deal, &prepared);

    if output.years.iter().any(|y| y.cash_flow < Decimal::ZERO) {
        warnings.push("Projected cash flow is negative in at least one year".into());
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Multi-Year Pro Forma (market-adjusted growth, monthly amortization)",
        input,
        warnings,
        elapsed,
        output,
    ))
}

pub(crate) fn effective_growth(deal: &DealInputs, prepared: &PreparedDeal) -> EffectiveGrowth {
    EffectiveGrowth {
        rent_growth: deal.annual_rent_growth_percent * prepared.market.rent_growth_adjustment,
        expense_growth: deal.annual_expense_growth_percent,
        appreciation: deal.annual_appreciation_percent * prepared.market.appreciation_adjustment,
    }
}

pub(crate) fn build_projection(deal: &DealInputs, prepared: &PreparedDeal) -> ProjectionOutput {
    let growth = effective_growth(deal, prepared);
    let rent_factor = Decimal::ONE + growth.rent_growth / dec!(100);
    let expense_factor = Decimal::ONE + growth.expense_growth / dec!(100);
    let value_factor = Decimal::ONE + growth.appreciation / dec!(100);

    let statement = &prepared.statement;
    let debt = &prepared.debt;
    let n = deal.holding_period_years;

    // Variable costs track income; fixed costs track expense inflation.
    let mut gross_income = statement.gross_annual_income;
    let mut variable = statement.variable_monthly_ops * dec!(12);
    let mut fixed = statement.fixed_monthly_ops * dec!(12);
    let mut value = deal.purchase_price;
    let mut balance = debt.principal;

    let mut years = Vec::with_capacity(n as usize);
    for year in 1..=n {
        if year > 1 {
            gross_income *= rent_factor;
            variable *= rent_factor;
            fixed *= expense_factor;
        }
        value *= value_factor;

        let mut debt_service = Decimal::ZERO;
        let mut interest_paid = Decimal::ZERO;
        let mut principal_paid = Decimal::ZERO;
        for _ in 0..12 {
            if balance <= Decimal::ZERO {
                break;
            }
            let split = payment_split(balance, debt.annual_interest_rate, debt.monthly_payment);
            interest_paid += split.interest;
            principal_paid += split.principal;
            debt_service += split.interest + split.principal;
            balance -= split.principal;
        }

        let operating_expenses = variable + fixed;
        let noi = gross_income - operating_expenses;
        let cash_flow = noi - debt_service;

        years.push(ProjectionYear {
            year,
            gross_income,
            operating_expenses,
            noi,
            debt_service,
            interest_paid,
            principal_paid,
            cash_flow,
            loan_balance: balance,
            property_value: value,
            equity: value - balance,
        });
    }

    let sale_price = value;
    let net_sale_proceeds = sale_price - balance;

    let all_in_cost = deal.purchase_price + deal.closing_costs + deal.rehab_costs;
    let mut unlevered_cash_flows = Vec::with_capacity(years.len() + 1);
    let mut levered_cash_flows = Vec::with_capacity(years.len() + 1);
    unlevered_cash_flows.push(-all_in_cost);
    levered_cash_flows.push(-deal.total_cash_invested());
    for y in &years {
        unlevered_cash_flows.push(y.noi);
        levered_cash_flows.push(y.cash_flow);
    }
    if let Some(last) = unlevered_cash_flows.last_mut() {
        *last += sale_price;
    }
    if let Some(last) = levered_cash_flows.last_mut() {
        *last += net_sale_proceeds;
    }

    ProjectionOutput {
        growth,
        years,
        sale_price,
        net_sale_proceeds,
        unlevered_cash_flows,
        levered_cash_flows,
    }
}
