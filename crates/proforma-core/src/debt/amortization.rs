use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::ProFormaError;
use crate::types::{clamp_percent, with_metadata, ComputationOutput, LoanTerms, Money, Percent};
use crate::ProFormaResult;

/// Amortization assumed when the caller quotes none.
pub const DEFAULT_AMORTIZATION_YEARS: u32 = 30;

/// Longest loan term any payment calculation accepts.
pub const MAX_AMORTIZATION_YEARS: u32 = 50;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Interest/principal split of one monthly payment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaymentSplit {
    pub interest: Money,
    pub principal: Money,
}

/// One year of an amortization schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationYear {
    pub year: u32,
    pub beginning_balance: Money,
    pub interest_paid: Money,
    pub principal_paid: Money,
    pub ending_balance: Money,
}

/// Debt service resolved from a deal's loan amount and its terms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtService {
    pub principal: Money,
    pub annual_interest_rate: Percent,
    pub amortization_years: u32,
    pub monthly_payment: Money,
    pub annual_debt_service: Money,
    /// First month's interest/principal split
    pub first_payment: PaymentSplit,
}

impl DebtService {
    /// Debt service of an unlevered deal.
    pub fn none() -> Self {
        DebtService {
            principal: Decimal::ZERO,
            annual_interest_rate: Decimal::ZERO,
            amortization_years: DEFAULT_AMORTIZATION_YEARS,
            monthly_payment: Decimal::ZERO,
            annual_debt_service: Decimal::ZERO,
            first_payment: PaymentSplit {
                interest: Decimal::ZERO,
                principal: Decimal::ZERO,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationInput {
    pub principal: Money,
    pub terms: LoanTerms,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationOutput {
    pub debt_service: DebtService,
    pub schedule: Vec<AmortizationYear>,
    pub total_interest: Money,
}

// ---------------------------------------------------------------------------
// Primitives
// ---------------------------------------------------------------------------

/// Financed amount: purchase price less down payment, floored at zero.
pub fn loan_amount(purchase_price: Money, down_payment: Money) -> Money {
    (purchase_price - down_payment).max(Decimal::ZERO)
}

/// Standard fixed-rate mortgage payment: P * r(1+r)^n / ((1+r)^n - 1),
/// with r the monthly rate derived from an annual percentage.
pub fn monthly_payment(
    principal: Money,
    annual_rate_percent: Percent,
    amortization_years: u32,
) -> ProFormaResult<Money> {
    validate_term("amortization_years", amortization_years)?;
    if principal <= Decimal::ZERO {
        return Ok(Decimal::ZERO);
    }

    let total_months = amortization_years * 12;
    let monthly_rate = annual_rate_percent / dec!(1200);

    if monthly_rate.is_zero() {
        return Ok(principal / Decimal::from(total_months));
    }

    let overflow = || {
        ProFormaError::invalid(
            "principal",
            "Loan payment overflows the decimal range for this principal, rate and term",
        )
    };

    let growth = Decimal::ONE + monthly_rate;
    let mut compound = Decimal::ONE;
    for _ in 0..total_months {
        compound = compound.checked_mul(growth).ok_or_else(overflow)?;
    }

    let denominator = compound - Decimal::ONE;
    if denominator.is_zero() {
        return Err(ProFormaError::DivisionByZero {
            context: "mortgage payment denominator".into(),
        });
    }

    principal
        .checked_mul(monthly_rate)
        .and_then(|p| p.checked_mul(compound))
        .and_then(|p| p.checked_div(denominator))
        .ok_or_else(overflow)
}

/// Reject loan terms outside 1..=MAX_AMORTIZATION_YEARS.
pub fn validate_term(field: &str, years: u32) -> ProFormaResult<()> {
    if !(1..=MAX_AMORTIZATION_YEARS).contains(&years) {
        return Err(ProFormaError::invalid(
            field,
            format!("Loan term must be between 1 and {MAX_AMORTIZATION_YEARS} years, got {years}"),
        ));
    }
    Ok(())
}

/// Split one payment into interest on the opening balance and principal.
pub fn payment_split(balance: Money, annual_rate_percent: Percent, payment: Money) -> PaymentSplit {
    let interest = balance * annual_rate_percent / dec!(1200);
    let principal = (payment - interest).min(balance);
    PaymentSplit {
        interest,
        principal,
    }
}

/// Outstanding balance after `payments_made` monthly payments.
pub fn remaining_balance(
    principal: Money,
    annual_rate_percent: Percent,
    amortization_years: u32,
    payments_made: u32,
) -> ProFormaResult<Money> {
    let payment = monthly_payment(principal, annual_rate_percent, amortization_years)?;
    let mut balance = principal;
    for _ in 0..payments_made.min(amortization_years * 12) {
        let split = payment_split(balance, annual_rate_percent, payment);
        balance -= split.principal;
        if balance <= Decimal::ZERO {
            return Ok(Decimal::ZERO);
        }
    }
    Ok(balance)
}

/// Yearly amortization summary over the full term.
pub fn amortization_schedule(
    principal: Money,
    annual_rate_percent: Percent,
    amortization_years: u32,
) -> ProFormaResult<Vec<AmortizationYear>> {
    let payment = monthly_payment(principal, annual_rate_percent, amortization_years)?;
    let mut schedule = Vec::with_capacity(amortization_years as usize);
    let mut balance = principal.max(Decimal::ZERO);

    for year in 1..=amortization_years {
        let beginning_balance = balance;
        let mut interest_paid = Decimal::ZERO;
        let mut principal_paid = Decimal::ZERO;

        for _ in 0..12 {
            if balance <= Decimal::ZERO {
                break;
            }
            let split = payment_split(balance, annual_rate_percent, payment);
            interest_paid += split.interest;
            principal_paid += split.principal;
            balance -= split.principal;
        }

        // Rounding residue on the final payment.
        if year == amortization_years && balance.abs() < dec!(0.01) {
            balance = Decimal::ZERO;
        }

        schedule.push(AmortizationYear {
            year,
            beginning_balance,
            interest_paid,
            principal_paid,
            ending_balance: balance,
        });
    }

    Ok(schedule)
}

/// Resolve monthly and annual debt service for `principal` under `terms`.
///
/// A quoted payment wins over the amortized one; the rate is clamped into
/// [0, 100] first.
pub fn resolve_debt_service(
    principal: Money,
    terms: &LoanTerms,
    warnings: &mut Vec<String>,
) -> ProFormaResult<DebtService> {
    let rate = clamp_percent("annual_interest_rate", terms.annual_interest_rate, warnings);
    let amortization_years = terms.amortization_years.unwrap_or(DEFAULT_AMORTIZATION_YEARS);
    validate_term("amortization_years", amortization_years)?;

    let payment = match terms.monthly_payment {
        Some(quoted) if quoted < Decimal::ZERO => {
            return Err(ProFormaError::invalid(
                "monthly_payment",
                "Quoted monthly payment cannot be negative",
            ));
        }
        Some(quoted) => quoted,
        None => monthly_payment(principal, rate, amortization_years)?,
    };

    if principal > Decimal::ZERO && payment > Decimal::ZERO {
        let first_interest = principal * rate / dec!(1200);
        if payment <= first_interest {
            warnings.push(format!(
                "Monthly payment {payment:.2} does not cover first-month interest \
                 {first_interest:.2}; the loan negatively amortizes"
            ));
        }
    }

    Ok(DebtService {
        principal,
        annual_interest_rate: rate,
        amortization_years,
        monthly_payment: payment,
        annual_debt_service: payment * dec!(12),
        first_payment: payment_split(principal, rate, payment),
    })
}

/// Debt service plus a yearly schedule for a single loan.
pub fn build_amortization(
    input: &AmortizationInput,
) -> ProFormaResult<ComputationOutput<AmortizationOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    tracing::debug!(principal = %input.principal, "building amortization schedule");

    if input.principal < Decimal::ZERO {
        return Err(ProFormaError::invalid("principal", "Principal cannot be negative"));
    }

    let debt_service = resolve_debt_service(input.principal, &input.terms, &mut warnings)?;
    let schedule = amortization_schedule(
        input.principal,
        debt_service.annual_interest_rate,
        debt_service.amortization_years,
    )?;
    let total_interest = schedule.iter().map(|y| y.interest_paid).sum();

    let output = AmortizationOutput {
        debt_service,
        schedule,
        total_interest,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Fixed-Rate Mortgage Amortization (monthly compounding)",
        input,
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn close(a: Decimal, b: Decimal, tol: Decimal) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn test_loan_amount_scenario() {
        assert_eq!(loan_amount(dec!(325000), dec!(65000)), dec!(260000));
        assert_eq!(loan_amount(dec!(100), dec!(150)), Decimal::ZERO);
    }

    #[test]
    fn test_monthly_payment_known_answers() {
        // 200k / 30y at 6.5% = 1264.14; at 5.5% = 1135.58
        let p1 = monthly_payment(dec!(200000), dec!(6.5), 30).unwrap();
        let p2 = monthly_payment(dec!(200000), dec!(5.5), 30).unwrap();
        assert!(close(p1, dec!(1264.14), dec!(0.01)), "got {p1}");
        assert!(close(p2, dec!(1135.58), dec!(0.01)), "got {p2}");
    }

    #[test]
    fn test_zero_rate_is_straight_line() {
        assert_eq!(monthly_payment(dec!(36000), Decimal::ZERO, 3).unwrap(), dec!(1000));
    }

    #[test]
    fn test_zero_term_rejected() {
        assert!(monthly_payment(dec!(1000), dec!(5), 0).is_err());
    }

    #[test]
    fn test_term_beyond_limit_rejected() {
        assert!(monthly_payment(dec!(100000), dec!(6), MAX_AMORTIZATION_YEARS).is_ok());
        assert!(matches!(
            monthly_payment(dec!(100000), dec!(100), 80),
            Err(ProFormaError::InvalidInput { .. })
        ));
        assert!(monthly_payment(dec!(100000), dec!(6), u32::MAX).is_err());
    }

    #[test]
    fn test_payment_overflow_is_an_error() {
        // (1 + 100%/12)^600 is about 7e20; a 1e10 principal leaves Decimal range
        let result = monthly_payment(dec!(10000000000), dec!(100), MAX_AMORTIZATION_YEARS);
        assert!(matches!(result, Err(ProFormaError::InvalidInput { .. })));
    }

    #[test]
    fn test_quoted_payment_still_checks_term() {
        let terms = LoanTerms {
            annual_interest_rate: dec!(6),
            monthly_payment: Some(dec!(900)),
            amortization_years: Some(1200),
        };
        assert!(resolve_debt_service(dec!(150000), &terms, &mut Vec::new()).is_err());
    }

    #[test]
    fn test_payment_split_first_month() {
        let pmt = monthly_payment(dec!(200000), dec!(6), 30).unwrap();
        let split = payment_split(dec!(200000), dec!(6), pmt);
        assert_eq!(split.interest, dec!(1000));
        assert!(close(split.principal, pmt - dec!(1000), dec!(0.0000001)));
    }

    #[test]
    fn test_schedule_pays_off_loan() {
        let schedule = amortization_schedule(dec!(100000), dec!(7), 15).unwrap();
        assert_eq!(schedule.len(), 15);
        assert_eq!(schedule.last().unwrap().ending_balance, Decimal::ZERO);
        let principal: Decimal = schedule.iter().map(|y| y.principal_paid).sum();
        assert!(close(principal, dec!(100000), dec!(0.01)));
    }

    #[test]
    fn test_remaining_balance_matches_schedule() {
        let schedule = amortization_schedule(dec!(250000), dec!(6.5), 30).unwrap();
        let bal = remaining_balance(dec!(250000), dec!(6.5), 30, 60).unwrap();
        assert!(close(bal, schedule[4].ending_balance, dec!(0.000001)));
    }

    #[test]
    fn test_quoted_payment_wins() {
        let terms = LoanTerms {
            annual_interest_rate: dec!(6),
            monthly_payment: Some(dec!(1500)),
            amortization_years: None,
        };
        let mut warnings = Vec::new();
        let ds = resolve_debt_service(dec!(200000), &terms, &mut warnings).unwrap();
        assert_eq!(ds.monthly_payment, dec!(1500));
        assert_eq!(ds.annual_debt_service, dec!(18000));
        assert_eq!(ds.amortization_years, DEFAULT_AMORTIZATION_YEARS);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_rate_above_hundred_is_clamped() {
        let terms = LoanTerms {
            annual_interest_rate: dec!(140),
            monthly_payment: None,
            amortization_years: Some(30),
        };
        let mut warnings = Vec::new();
        let ds = resolve_debt_service(dec!(1000), &terms, &mut warnings).unwrap();
        assert_eq!(ds.annual_interest_rate, dec!(100));
        assert!(!warnings.is_empty());
    }
}
