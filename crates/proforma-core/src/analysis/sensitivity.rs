use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::ProFormaError;
use crate::types::{
    percent_of, with_metadata, ComputationOutput, Money, OperatingAssumptions, Percent,
};
use crate::ProFormaResult;

/// Cash-flow elasticity of the linear heuristic: a +10% expense multiplier
/// takes 1% off the base cash flow.
const CASH_FLOW_ELASTICITY: Decimal = dec!(0.1);

/// Upper bound on sweep points.
pub const MAX_STEP_COUNT: u32 = 100;

fn default_step_count() -> u32 {
    5
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityInput {
    pub base_operating: OperatingAssumptions,
    /// Half-width of the sweep, in percent (20 = -20% .. +20%)
    pub range_percent: Percent,
    #[serde(default = "default_step_count")]
    pub step_count: u32,
    pub base_monthly_cash_flow: Money,
    pub total_cash_invested: Money,
}

/// One point of the sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityRow {
    /// Expense level relative to base, percent (100 = unperturbed)
    pub scenario_percent: Percent,
    pub multiplier: Decimal,
    pub maintenance: Percent,
    pub vacancy: Percent,
    pub management: Percent,
    pub cap_ex: Percent,
    pub op_ex: Percent,
    pub monthly_cash_flow: Money,
    pub annual_cash_flow: Money,
    pub cash_on_cash: Option<Percent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityOutput {
    /// Ascending by multiplier
    pub rows: Vec<SensitivityRow>,
    /// Index of the unperturbed row, present for odd step counts
    pub base_row_index: Option<usize>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Evenly spaced multipliers across [-range, +range] percent, endpoints
/// inclusive: `m_i = range * (2i - (n-1)) / (n-1) / 100`.
pub fn sensitivity_multipliers(
    range_percent: Percent,
    step_count: u32,
) -> ProFormaResult<Vec<Decimal>> {
    if step_count == 0 {
        return Err(ProFormaError::invalid(
            "step_count",
            "Sensitivity sweep needs at least one step",
        ));
    }
    if step_count > MAX_STEP_COUNT {
        return Err(ProFormaError::invalid(
            "step_count",
            format!("Sensitivity sweep is limited to {MAX_STEP_COUNT} steps"),
        ));
    }
    if range_percent < Decimal::ZERO {
        return Err(ProFormaError::invalid(
            "range_percent",
            "Sensitivity range cannot be negative",
        ));
    }
    if step_count == 1 {
        return Ok(vec![Decimal::ZERO]);
    }

    let span = Decimal::from(step_count - 1);
    (0..step_count)
        .map(|i| {
            let offset = Decimal::from(2 * i64::from(i) - i64::from(step_count - 1));
            range_percent
                .checked_mul(offset)
                .map(|m| m / span / dec!(100))
                .ok_or_else(|| {
                    ProFormaError::invalid("range_percent", "Sensitivity range is too large")
                })
        })
        .collect()
}

/// Sweep the five operating percentages through a symmetric band and
/// estimate the cash flow at each point.
pub fn run_sensitivity_sweep(
    input: &SensitivityInput,
) -> ProFormaResult<ComputationOutput<SensitivityOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    tracing::debug!(
        range = %input.range_percent,
        steps = input.step_count,
        "running sensitivity sweep"
    );

    let multipliers = sensitivity_multipliers(input.range_percent, input.step_count)?;
    if input.range_percent > dec!(100) {
        warnings.push(format!(
            "A range of {}% drives the low end below zero expenses",
            input.range_percent
        ));
    }
    if input.total_cash_invested.is_zero() {
        warnings.push("No cash invested: cash-on-cash is not applicable".into());
    }

    let rows: Vec<SensitivityRow> = multipliers
        .iter()
        .map(|&m| sensitivity_row(input, m))
        .collect();
    let base_row_index = rows.iter().position(|r| r.multiplier.is_zero());

    let output = SensitivityOutput {
        rows,
        base_row_index,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Operating Expense Sensitivity Sweep (linear cash-flow heuristic)",
        input,
        warnings,
        elapsed,
        output,
    ))
}

fn sensitivity_row(input: &SensitivityInput, multiplier: Decimal) -> SensitivityRow {
    let factor = Decimal::ONE + multiplier;
    let ops = input.base_operating.scaled(factor);
    let monthly_cash_flow =
        input.base_monthly_cash_flow * (Decimal::ONE - multiplier * CASH_FLOW_ELASTICITY);
    let annual_cash_flow = monthly_cash_flow * dec!(12);

    SensitivityRow {
        scenario_percent: factor * dec!(100),
        multiplier,
        maintenance: ops.maintenance,
        vacancy: ops.vacancy,
        management: ops.management,
        cap_ex: ops.cap_ex,
        op_ex: ops.op_ex,
        monthly_cash_flow,
        annual_cash_flow,
        cash_on_cash: percent_of(annual_cash_flow, input.total_cash_invested),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn input(range: Decimal, steps: u32) -> SensitivityInput {
        SensitivityInput {
            base_operating: OperatingAssumptions {
                maintenance: dec!(5),
                vacancy: dec!(5),
                management: dec!(8),
                cap_ex: dec!(5),
                op_ex: dec!(10),
                fixed_monthly_costs: Decimal::ZERO,
            },
            range_percent: range,
            step_count: steps,
            base_monthly_cash_flow: dec!(1000),
            total_cash_invested: dec!(60000),
        }
    }

    #[test]
    fn test_multipliers_are_symmetric() {
        let m = sensitivity_multipliers(dec!(20), 5).unwrap();
        assert_eq!(m, vec![dec!(-0.2), dec!(-0.1), dec!(0), dec!(0.1), dec!(0.2)]);
    }

    #[test]
    fn test_even_count_has_no_base_row() {
        let out = run_sensitivity_sweep(&input(dec!(30), 4)).unwrap().result;
        assert_eq!(out.rows.len(), 4);
        assert_eq!(out.base_row_index, None);
        assert_eq!(out.rows[0].multiplier, dec!(-0.3));
        assert_eq!(out.rows[3].multiplier, dec!(0.3));
    }

    #[test]
    fn test_single_step_is_unperturbed() {
        let out = run_sensitivity_sweep(&input(dec!(20), 1)).unwrap().result;
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].scenario_percent, dec!(100));
        assert_eq!(out.rows[0].monthly_cash_flow, dec!(1000));
    }

    #[test]
    fn test_rows_scale_percentages_and_cash_flow() {
        let out = run_sensitivity_sweep(&input(dec!(20), 5)).unwrap().result;
        let high = &out.rows[4];
        assert_eq!(high.scenario_percent, dec!(120));
        assert_eq!(high.maintenance, dec!(6));
        assert_eq!(high.op_ex, dec!(12));
        // 1000 * (1 - 0.2 * 0.1)
        assert_eq!(high.monthly_cash_flow, dec!(980));
        assert_eq!(high.annual_cash_flow, dec!(11760));
        assert_eq!(high.cash_on_cash, Some(dec!(19.6)));
    }

    #[test]
    fn test_zero_steps_and_negative_range_rejected() {
        assert!(run_sensitivity_sweep(&input(dec!(20), 0)).is_err());
        assert!(run_sensitivity_sweep(&input(dec!(-5), 3)).is_err());
    }

    #[test]
    fn test_step_count_capped() {
        let out = run_sensitivity_sweep(&input(dec!(20), MAX_STEP_COUNT)).unwrap().result;
        assert_eq!(out.rows.len(), 100);
        assert!(run_sensitivity_sweep(&input(dec!(20), MAX_STEP_COUNT + 1)).is_err());
        assert!(sensitivity_multipliers(dec!(20), u32::MAX).is_err());
    }

    #[test]
    fn test_zero_cash_invested_has_no_cash_on_cash() {
        let mut i = input(dec!(10), 3);
        i.total_cash_invested = Decimal::ZERO;
        let out = run_sensitivity_sweep(&i).unwrap();
        assert!(out.result.rows.iter().all(|r| r.cash_on_cash.is_none()));
        assert_eq!(out.warnings.len(), 1);
    }
}
