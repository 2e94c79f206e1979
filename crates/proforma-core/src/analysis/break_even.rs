use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::deal::{prepare_deal, DealAnalysisInput};
use crate::operating::expenses::break_even_occupancy;
use crate::operating::income::{uses_daily_rate, DAYS_PER_MONTH};
use crate::settings::{AnalysisSettings, ExpenseBasis};
use crate::types::{percent_of, ratio, with_metadata, ComputationOutput, Money, Percent};
use crate::ProFormaResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakEvenOutput {
    pub gross_potential_revenue: Money,
    pub annual_operating_expenses: Money,
    pub annual_debt_service: Money,
    /// Operating expenses / gross potential revenue, percent
    pub break_even_occupancy: Option<Percent>,
    /// (Operating expenses + debt service) / gross potential revenue, percent
    pub break_even_occupancy_with_debt: Option<Percent>,
    /// Modeled occupancy: the revenue model's rate, or 100 less vacancy
    pub current_occupancy: Percent,
    /// Current less break-even (with debt) occupancy, percentage points
    pub margin_of_safety_points: Option<Percent>,
    /// Margin of safety as a percent of current occupancy
    pub margin_of_safety_percent: Option<Percent>,
    /// Monthly income at which cash flow after debt service is zero
    pub break_even_monthly_income: Option<Money>,
    /// Daily rate reaching that income at current occupancy (room revenue only)
    pub break_even_adr: Option<Money>,
}

/// Break-even occupancy, rent and ADR with the margin of safety.
pub fn analyze_break_even(
    input: &DealAnalysisInput,
    settings: &AnalysisSettings,
) -> ProFormaResult<ComputationOutput<BreakEvenOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    tracing::debug!("analyzing break-even");

    let prepared = prepare_deal(input, settings, &mut warnings)?;
    let statement = &prepared.statement;
    let annual_debt_service = prepared.debt.annual_debt_service;

    let be_occupancy = break_even_occupancy(
        statement.annual_operating_expenses,
        statement.gross_potential_revenue,
    );
    let be_occupancy_with_debt = break_even_occupancy(
        statement.annual_operating_expenses + annual_debt_service,
        statement.gross_potential_revenue,
    );

    let room_model = if uses_daily_rate(input.deal.operation_type, input.deal.property_type) {
        input.income.revenue_model.as_ref()
    } else {
        None
    };
    let current_occupancy = match room_model {
        Some(model) => model.occupancy_rate.clamp(Decimal::ZERO, dec!(100)),
        None => dec!(100) - input.operating.vacancy.clamp(Decimal::ZERO, dec!(100)),
    };

    let margin_of_safety_points = be_occupancy_with_debt.map(|be| current_occupancy - be);
    let margin_of_safety_percent =
        margin_of_safety_points.and_then(|points| percent_of(points, current_occupancy));
    if let Some(points) = margin_of_safety_points {
        if points < Decimal::ZERO {
            warnings.push(format!(
                "Occupancy is {:.1} points below break-even",
                points.abs()
            ));
        }
    }

    // Income that covers fixed costs and debt after the variable share.
    let variable_share = match statement.expense_basis {
        ExpenseBasis::PercentOfIncome => statement.total_variable_percent / dec!(100),
        ExpenseBasis::LegacyFixedDollar => Decimal::ZERO,
    };
    let break_even_monthly_income = if variable_share < Decimal::ONE {
        let fixed_monthly = statement.fixed_monthly_ops + prepared.debt.monthly_payment;
        Some(fixed_monthly / (Decimal::ONE - variable_share))
    } else {
        warnings.push("Variable expenses consume all income; no break-even income exists".into());
        None
    };

    let break_even_adr = match (room_model, break_even_monthly_income) {
        (Some(model), Some(income)) => ratio(
            income,
            Decimal::from(model.total_rooms) * current_occupancy / dec!(100) * DAYS_PER_MONTH,
        ),
        _ => None,
    };

    let output = BreakEvenOutput {
        gross_potential_revenue: statement.gross_potential_revenue,
        annual_operating_expenses: statement.annual_operating_expenses,
        annual_debt_service,
        break_even_occupancy: be_occupancy,
        break_even_occupancy_with_debt: be_occupancy_with_debt,
        current_occupancy,
        margin_of_safety_points,
        margin_of_safety_percent,
        break_even_monthly_income,
        break_even_adr,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Break-Even Analysis (occupancy, income, ADR, margin of safety)",
        input,
        warnings,
        elapsed,
        output,
    ))
}
