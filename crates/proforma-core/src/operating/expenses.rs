use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::operating::income::{
    compute_monthly_income, uses_daily_rate, IncomeSource, DAYS_PER_MONTH,
};
use crate::settings::{AnalysisSettings, ExpenseBasis};
use crate::types::{
    percent_of, with_metadata, ComputationOutput, Money, OperatingAssumptions, OperationType,
    Percent, PropertyType,
};
use crate::ProFormaResult;

/// Dollar scale the legacy formula applies to the percentage sum.
const LEGACY_DOLLARS_PER_POINT: Decimal = dec!(1000);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatingInput {
    pub income: IncomeSource,
    #[serde(default)]
    pub operation_type: OperationType,
    #[serde(default)]
    pub property_type: PropertyType,
    pub operating: OperatingAssumptions,
}

/// Monthly and annual roll-up from income down to NOI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatingStatement {
    pub expense_basis: ExpenseBasis,
    pub monthly_income: Money,
    pub fixed_monthly_ops: Money,
    pub variable_monthly_ops: Money,
    pub total_monthly_ops: Money,
    pub monthly_noi: Money,
    pub gross_annual_income: Money,
    /// Income at full occupancy; equals gross annual income for flat income
    pub gross_potential_revenue: Money,
    pub annual_operating_expenses: Money,
    /// (income - fixed - variable) x 12
    pub annual_noi: Money,
    /// Operating expenses / gross income, percent
    pub expense_ratio: Option<Percent>,
    /// Sum of the five operating percentages (uncapped)
    pub total_variable_percent: Percent,
}

// ---------------------------------------------------------------------------
// Primitives
// ---------------------------------------------------------------------------

/// Fixed monthly operating cost under `basis`.
///
/// `LegacyFixedDollar` reproduces the legacy Analyze UI: the percentage sum times
/// 1000, no explicit costs. `PercentOfIncome` takes only explicit fixed
/// costs: `fixed_monthly_costs` plus `fixed_annual_costs / 12`.
pub fn compute_fixed_monthly_ops(
    ops: &OperatingAssumptions,
    fixed_annual_costs: Money,
    basis: ExpenseBasis,
) -> Money {
    match basis {
        ExpenseBasis::LegacyFixedDollar => ops.total_variable_percent() * LEGACY_DOLLARS_PER_POINT,
        ExpenseBasis::PercentOfIncome => ops.fixed_monthly_costs + fixed_annual_costs / dec!(12),
    }
}

/// Percentage-driven monthly cost: income x (sum of the five) / 100. Zero
/// under the legacy basis, which already counted them as fixed dollars.
pub fn variable_monthly_from_percentages(
    monthly_income: Money,
    ops: &OperatingAssumptions,
    basis: ExpenseBasis,
) -> Money {
    match basis {
        ExpenseBasis::LegacyFixedDollar => Decimal::ZERO,
        ExpenseBasis::PercentOfIncome => monthly_income * ops.total_variable_percent() / dec!(100),
    }
}

/// Assemble the statement for a known monthly income. Percentages are
/// clamped into [0, 100] first.
pub fn build_operating_statement(
    monthly_income: Money,
    ops: &OperatingAssumptions,
    fixed_annual_costs: Money,
    basis: ExpenseBasis,
    warnings: &mut Vec<String>,
) -> OperatingStatement {
    let ops = ops.clamped(warnings);
    let total_variable_percent = ops.total_variable_percent();
    if total_variable_percent > dec!(100) {
        warnings.push(format!(
            "Operating percentages total {total_variable_percent}% of income, above 100%"
        ));
    }

    let fixed_monthly_ops = compute_fixed_monthly_ops(&ops, fixed_annual_costs, basis);
    let variable_monthly_ops = variable_monthly_from_percentages(monthly_income, &ops, basis);
    let total_monthly_ops = fixed_monthly_ops + variable_monthly_ops;
    let monthly_noi = monthly_income - total_monthly_ops;

    let gross_annual_income = monthly_income * dec!(12);
    let annual_operating_expenses = total_monthly_ops * dec!(12);
    let annual_noi = monthly_noi * dec!(12);

    if annual_noi < Decimal::ZERO {
        warnings.push(format!("Negative NOI of {annual_noi:.2}: expenses exceed income"));
    }

    OperatingStatement {
        expense_basis: basis,
        monthly_income,
        fixed_monthly_ops,
        variable_monthly_ops,
        total_monthly_ops,
        monthly_noi,
        gross_annual_income,
        gross_potential_revenue: gross_annual_income,
        annual_operating_expenses,
        annual_noi,
        expense_ratio: percent_of(annual_operating_expenses, gross_annual_income),
        total_variable_percent,
    }
}

/// Income, operating expenses and NOI for a deal.
pub fn compute_operating_expenses(
    input: &OperatingInput,
    settings: &AnalysisSettings,
) -> ProFormaResult<ComputationOutput<OperatingStatement>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    tracing::debug!(basis = ?settings.expense_basis, "computing operating statement");

    let statement = operating_statement_for(input, settings.expense_basis, &mut warnings)?;

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        match settings.expense_basis {
            ExpenseBasis::PercentOfIncome => "Operating Statement (percent-of-income expenses)",
            ExpenseBasis::LegacyFixedDollar => "Operating Statement (legacy fixed-dollar expenses)",
        },
        input,
        warnings,
        elapsed,
        statement,
    ))
}

/// Statement without the output envelope, for chaining inside the crate.
pub(crate) fn operating_statement_for(
    input: &OperatingInput,
    basis: ExpenseBasis,
    warnings: &mut Vec<String>,
) -> ProFormaResult<OperatingStatement> {
    let monthly_income = compute_monthly_income(
        &input.income,
        input.operation_type,
        input.property_type,
        warnings,
    )?;

    let daily_rate_model = if uses_daily_rate(input.operation_type, input.property_type) {
        input.income.revenue_model.as_ref()
    } else {
        None
    };
    let fixed_annual_costs = daily_rate_model
        .map(|m| m.fixed_annual_costs)
        .unwrap_or(Decimal::ZERO);

    if basis == ExpenseBasis::LegacyFixedDollar
        && (input.operating.fixed_monthly_costs > Decimal::ZERO
            || fixed_annual_costs > Decimal::ZERO)
    {
        warnings.push(
            "Explicit fixed costs are ignored under the legacy fixed-dollar basis".into(),
        );
    }

    let mut statement = build_operating_statement(
        monthly_income,
        &input.operating,
        fixed_annual_costs,
        basis,
        warnings,
    );
    if let Some(model) = daily_rate_model {
        statement.gross_potential_revenue = Decimal::from(model.total_rooms)
            * model.average_daily_rate
            * DAYS_PER_MONTH
            * dec!(12);
    }
    Ok(statement)
}

/// Occupancy (percent of gross potential revenue) needed to cover
/// `annual_costs`. `None` without potential revenue.
pub fn break_even_occupancy(
    annual_costs: Money,
    gross_potential_revenue: Money,
) -> Option<Percent> {
    percent_of(annual_costs, gross_potential_revenue)
}
