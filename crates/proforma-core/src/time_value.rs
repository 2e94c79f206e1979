use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::ProFormaError;
use crate::types::{Money, Rate};
use crate::ProFormaResult;

const CONVERGENCE_THRESHOLD: Decimal = dec!(0.0000001);
const MAX_IRR_ITERATIONS: u32 = 100;
const MAX_BISECTION_ITERATIONS: u32 = 200;

// Solver bounds. The floor keeps (1+r)^-t inside Decimal range for the
// 30-year horizons DealInputs allows.
const IRR_FLOOR: Rate = dec!(-0.75);
const IRR_CEILING: Rate = dec!(10);

/// Net Present Value of a series of periodic cash flows (t = 0 undiscounted).
pub fn npv(rate: Rate, cash_flows: &[Money]) -> ProFormaResult<Money> {
    if rate <= dec!(-1) {
        return Err(ProFormaError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }

    let one_plus_r = Decimal::ONE + rate;
    let mut result = Decimal::ZERO;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount = discount
                .checked_mul(one_plus_r)
                .ok_or_else(|| overflow("NPV", t))?;
        }
        result = cf
            .checked_div(discount)
            .and_then(|pv| result.checked_add(pv))
            .ok_or_else(|| overflow("NPV", t))?;
    }

    Ok(result)
}

fn overflow(function: &str, period: usize) -> ProFormaError {
    ProFormaError::InvalidInput {
        field: "cash_flows".into(),
        reason: format!("{function} overflowed the decimal range at period {period}"),
    }
}

/// NPV(r) = sum CF_t / (1+r)^t, or `None` when the sum leaves Decimal range.
fn checked_npv_value(cash_flows: &[Money], rate: Rate) -> Option<Decimal> {
    let one_plus_r = Decimal::ONE + rate;
    let mut value = Decimal::ZERO;
    let mut discount = Decimal::ONE;

    for cf in cash_flows {
        value = value.checked_add(cf.checked_mul(discount)?)?;
        discount = discount.checked_div(one_plus_r)?;
    }

    Some(value)
}

/// NPV and its derivative d(NPV)/dr, or `None` on overflow.
fn npv_and_derivative(cash_flows: &[Money], rate: Rate) -> Option<(Decimal, Decimal)> {
    let one_plus_r = Decimal::ONE + rate;
    let mut value = Decimal::ZERO;
    let mut slope = Decimal::ZERO;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        let pv = cf.checked_mul(discount)?;
        value = value.checked_add(pv)?;
        if t > 0 {
            let term = Decimal::from(t as i64)
                .checked_mul(pv)?
                .checked_div(one_plus_r)?;
            slope = slope.checked_sub(term)?;
        }
        discount = discount.checked_div(one_plus_r)?;
    }

    Some((value, slope))
}

fn require_sign_change(cash_flows: &[Money]) -> ProFormaResult<()> {
    if cash_flows.len() < 2 {
        return Err(ProFormaError::InsufficientData(
            "IRR requires at least 2 cash flows".into(),
        ));
    }
    let has_negative = cash_flows.iter().any(|cf| *cf < Decimal::ZERO);
    let has_positive = cash_flows.iter().any(|cf| *cf > Decimal::ZERO);
    if !(has_negative && has_positive) {
        return Err(ProFormaError::InsufficientData(
            "IRR requires at least one negative and one positive cash flow".into(),
        ));
    }
    Ok(())
}

/// Internal Rate of Return using Newton-Raphson.
pub fn irr(cash_flows: &[Money], guess: Rate) -> ProFormaResult<Rate> {
    require_sign_change(cash_flows)?;

    let mut rate = guess;
    for i in 0..MAX_IRR_ITERATIONS {
        let (value, slope) =
            npv_and_derivative(cash_flows, rate).ok_or_else(|| ProFormaError::ConvergenceFailure {
                function: "IRR".into(),
                iterations: i,
                last_delta: Decimal::MAX,
            })?;

        if value.abs() < CONVERGENCE_THRESHOLD {
            return Ok(rate);
        }
        if slope.is_zero() {
            return Err(ProFormaError::ConvergenceFailure {
                function: "IRR".into(),
                iterations: i,
                last_delta: value,
            });
        }

        let next = value
            .checked_div(slope)
            .and_then(|step| rate.checked_sub(step))
            .unwrap_or(IRR_FLOOR);
        if (next - rate).abs() < CONVERGENCE_THRESHOLD {
            return Ok(next);
        }
        rate = next.clamp(IRR_FLOOR, IRR_CEILING);
    }

    Err(ProFormaError::ConvergenceFailure {
        function: "IRR".into(),
        iterations: MAX_IRR_ITERATIONS,
        last_delta: checked_npv_value(cash_flows, rate).unwrap_or(Decimal::MAX),
    })
}

/// IRR by bisection over [low, high]. Slower than Newton but cannot diverge
/// once the bracket holds a sign change.
pub fn irr_bisection(cash_flows: &[Money], low: Rate, high: Rate) -> ProFormaResult<Rate> {
    require_sign_change(cash_flows)?;

    let evaluate = |rate: Rate, iterations: u32| {
        checked_npv_value(cash_flows, rate).ok_or_else(|| ProFormaError::ConvergenceFailure {
            function: "IRR bisection".into(),
            iterations,
            last_delta: Decimal::MAX,
        })
    };

    let mut lo = low;
    let mut hi = high;
    let mut f_lo = evaluate(lo, 0)?;
    let f_hi = evaluate(hi, 0)?;

    if f_lo.is_sign_negative() == f_hi.is_sign_negative() {
        return Err(ProFormaError::ConvergenceFailure {
            function: "IRR bisection".into(),
            iterations: 0,
            last_delta: f_lo,
        });
    }

    for i in 0..MAX_BISECTION_ITERATIONS {
        let mid = (lo + hi) / dec!(2);
        let f_mid = evaluate(mid, i)?;

        if f_mid.abs() < CONVERGENCE_THRESHOLD || (hi - lo) < CONVERGENCE_THRESHOLD {
            return Ok(mid);
        }
        if f_mid.is_sign_negative() == f_lo.is_sign_negative() {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }

    Ok((lo + hi) / dec!(2))
}

/// Newton-Raphson from 10%, falling back to bisection over (-75%, 1000%).
pub fn solve_irr(cash_flows: &[Money]) -> ProFormaResult<Rate> {
    match irr(cash_flows, dec!(0.10)) {
        Ok(rate) => Ok(rate),
        Err(ProFormaError::ConvergenceFailure { .. }) => {
            tracing::debug!("newton irr did not converge, bisecting");
            irr_bisection(cash_flows, IRR_FLOOR, IRR_CEILING)
        }
        Err(e) => Err(e),
    }
}

/// Single-compounding return approximation:
/// `((total_return + investment) / investment)^(1/years) - 1`.
///
/// `None` when the investment or horizon is not positive, or the ending
/// value is not positive.
pub fn closed_form_irr(investment: Money, total_return: Money, years: u32) -> Option<Rate> {
    if investment <= Decimal::ZERO || years == 0 {
        return None;
    }
    let growth = (total_return + investment) / investment;
    if growth <= Decimal::ZERO {
        return None;
    }
    if years == 1 {
        return Some(growth - Decimal::ONE);
    }
    let exponent = Decimal::ONE / Decimal::from(years);
    growth.checked_powd(exponent).map(|g| g - Decimal::ONE)
}

/// Present value of a level monthly amount over `months`, discounted at an
/// annual percentage rate compounded monthly.
pub fn pv_monthly_annuity(
    amount: Money,
    annual_rate_percent: Decimal,
    months: u32,
) -> ProFormaResult<Money> {
    let overflow = || ProFormaError::InvalidInput {
        field: "horizon_months".into(),
        reason: "Present value overflows the decimal range for this horizon".into(),
    };
    let monthly_rate = annual_rate_percent / dec!(1200);
    if monthly_rate.is_zero() {
        return amount.checked_mul(Decimal::from(months)).ok_or_else(overflow);
    }
    let one_plus_r = Decimal::ONE + monthly_rate;
    let mut discount = Decimal::ONE;
    let mut total = Decimal::ZERO;
    for _ in 0..months {
        discount = discount.checked_div(one_plus_r).ok_or_else(overflow)?;
        total = amount
            .checked_mul(discount)
            .and_then(|pv| total.checked_add(pv))
            .ok_or_else(overflow)?;
    }
    Ok(total)
}
