use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::debt::amortization::{
    monthly_payment, payment_split, validate_term, DEFAULT_AMORTIZATION_YEARS,
};
use crate::error::ProFormaError;
use crate::settings::AnalysisSettings;
use crate::time_value::pv_monthly_annuity;
use crate::types::{clamp_percent, ratio, with_metadata, ComputationOutput, Money, Percent};
use crate::ProFormaResult;

const MIN_CREDIT_SCORE: u32 = 300;
const MAX_CREDIT_SCORE: u32 = 850;
/// Longest horizon savings are totaled over (50 years).
const MAX_HORIZON_MONTHS: u32 = 600;

fn default_term() -> u32 {
    DEFAULT_AMORTIZATION_YEARS
}

fn default_horizon() -> u32 {
    60
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The loan being refinanced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentLoan {
    pub balance: Money,
    /// Percent (6.5 = 6.5%)
    pub annual_interest_rate: Percent,
    /// Quoted payment; amortized over the remaining term when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_payment: Option<Money>,
    #[serde(default = "default_term")]
    pub remaining_term_years: u32,
    pub property_value: Money,
}

/// Equity movement at closing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RefinanceKind {
    #[default]
    RateAndTerm,
    /// Borrow `amount` on top of the payoff
    CashOut { amount: Money },
    /// Pay `amount` down at closing
    CashIn { amount: Money },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinanceCandidate {
    pub new_rate: Percent,
    #[serde(default = "default_term")]
    pub term_years: u32,
    /// Closing costs as a percent of the new principal
    pub closing_cost_percent: Percent,
    #[serde(default)]
    pub kind: RefinanceKind,
    /// Months over which savings are totaled and discounted
    #[serde(default = "default_horizon")]
    pub horizon_months: u32,
    /// Overrides the settings' discount rate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_rate_percent: Option<Percent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinanceInput {
    pub current: CurrentLoan,
    pub candidate: RefinanceCandidate,
    pub credit_score: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinanceComparison {
    pub current_payment: Money,
    pub new_payment: Money,
    pub new_principal: Money,
    pub closing_costs: Money,
    pub monthly_savings: Money,
    /// `None` when the refinance does not save money each month
    pub break_even_months: Option<Decimal>,
    pub new_ltv: Percent,
    pub net_present_value: Money,
    pub total_savings_over_horizon: Money,
    /// Interest left to pay on the current loan
    pub remaining_interest_current: Money,
    /// Interest over the full life of the new loan
    pub total_interest_new: Money,
    /// New lifetime interest less remaining current interest
    pub lifetime_interest_change: Money,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    /// 1 (safest) to 10
    pub risk_score: u32,
}

/// Result of a refinance comparison. A breach of the LTV ceiling is a
/// business outcome, not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome")]
pub enum RefinanceOutcome {
    Approved(RefinanceComparison),
    NotAllowed {
        reason: String,
        new_ltv: Percent,
        max_ltv: Percent,
    },
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Compare a candidate refinance against the current loan.
pub fn compare_refinance(
    input: &RefinanceInput,
    settings: &AnalysisSettings,
) -> ProFormaResult<ComputationOutput<RefinanceOutcome>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    tracing::debug!(
        balance = %input.current.balance,
        new_rate = %input.candidate.new_rate,
        "comparing refinance"
    );

    settings.validate()?;
    let outcome = evaluate(input, settings, &mut warnings)?;

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Refinance Comparison (amortized payments, monthly-discounted savings)",
        input,
        warnings,
        elapsed,
        outcome,
    ))
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

fn evaluate(
    input: &RefinanceInput,
    settings: &AnalysisSettings,
    warnings: &mut Vec<String>,
) -> ProFormaResult<RefinanceOutcome> {
    let current = &input.current;
    let candidate = &input.candidate;

    if current.balance < Decimal::ZERO {
        return Err(ProFormaError::invalid("balance", "Loan balance cannot be negative"));
    }
    if current.property_value <= Decimal::ZERO {
        return Err(ProFormaError::invalid(
            "property_value",
            "Property value must be positive",
        ));
    }

    validate_term("remaining_term_years", current.remaining_term_years)?;
    validate_term("term_years", candidate.term_years)?;
    if candidate.horizon_months > MAX_HORIZON_MONTHS {
        return Err(ProFormaError::invalid(
            "horizon_months",
            format!("Horizon cannot exceed {MAX_HORIZON_MONTHS} months"),
        ));
    }

    let current_rate =
        clamp_percent("annual_interest_rate", current.annual_interest_rate, warnings);
    let new_rate = clamp_percent("new_rate", candidate.new_rate, warnings);
    let closing_pct =
        clamp_percent("closing_cost_percent", candidate.closing_cost_percent, warnings);
    let credit_score = input.credit_score.clamp(MIN_CREDIT_SCORE, MAX_CREDIT_SCORE);
    if credit_score != input.credit_score {
        warnings.push(format!(
            "Credit score {} is outside {MIN_CREDIT_SCORE}-{MAX_CREDIT_SCORE} and was \
             clamped to {credit_score}",
            input.credit_score
        ));
    }

    let (cash_out, cash_in) = match candidate.kind {
        RefinanceKind::RateAndTerm => (Decimal::ZERO, Decimal::ZERO),
        RefinanceKind::CashOut { amount } => (amount, Decimal::ZERO),
        RefinanceKind::CashIn { amount } => (Decimal::ZERO, amount),
    };
    if cash_out < Decimal::ZERO || cash_in < Decimal::ZERO {
        return Err(ProFormaError::invalid("kind", "Cash amounts cannot be negative"));
    }
    if cash_in > current.balance {
        return Err(ProFormaError::invalid(
            "kind",
            "Cash-in cannot exceed the current balance",
        ));
    }

    let new_principal = current.balance + cash_out - cash_in;
    let new_ltv = new_principal / current.property_value * dec!(100);
    if new_ltv > settings.max_refinance_ltv {
        tracing::warn!(
            %new_ltv,
            max = %settings.max_refinance_ltv,
            "refinance exceeds LTV ceiling"
        );
        return Ok(RefinanceOutcome::NotAllowed {
            reason: format!(
                "New LTV of {:.1}% exceeds the {}% maximum",
                new_ltv, settings.max_refinance_ltv
            ),
            new_ltv,
            max_ltv: settings.max_refinance_ltv,
        });
    }

    let current_payment = match current.monthly_payment {
        Some(quoted) => quoted,
        None => monthly_payment(current.balance, current_rate, current.remaining_term_years)?,
    };
    let new_payment = monthly_payment(new_principal, new_rate, candidate.term_years)?;

    let monthly_savings = current_payment - new_payment;
    let closing_costs = new_principal * closing_pct / dec!(100);
    let break_even_months = if monthly_savings > Decimal::ZERO {
        ratio(closing_costs, monthly_savings)
    } else {
        None
    };

    let horizon = candidate.horizon_months;
    let discount = candidate
        .discount_rate_percent
        .unwrap_or(settings.discount_rate_percent);
    let net_present_value = pv_monthly_annuity(monthly_savings, discount, horizon)? - closing_costs;
    let total_savings_over_horizon = monthly_savings * Decimal::from(horizon) - closing_costs;

    let remaining_interest_current = interest_until_paid(
        current.balance,
        current_rate,
        current_payment,
        current.remaining_term_years * 12,
    );
    let total_interest_new =
        interest_until_paid(new_principal, new_rate, new_payment, candidate.term_years * 12);
    let lifetime_interest_change = total_interest_new - remaining_interest_current;

    let mut comparison = RefinanceComparison {
        current_payment,
        new_payment,
        new_principal,
        closing_costs,
        monthly_savings,
        break_even_months,
        new_ltv,
        net_present_value,
        total_savings_over_horizon,
        remaining_interest_current,
        total_interest_new,
        lifetime_interest_change,
        pros: Vec::new(),
        cons: Vec::new(),
        risk_score: 0,
    };
    let (pros, cons) = pros_and_cons(&comparison, input, current_rate, new_rate, cash_out, cash_in);
    comparison.pros = pros;
    comparison.cons = cons;
    comparison.risk_score = refinance_risk_score(new_ltv, credit_score, cash_out, monthly_savings);

    Ok(RefinanceOutcome::Approved(comparison))
}

/// Interest paid over at most `months` payments.
fn interest_until_paid(principal: Money, rate: Percent, payment: Money, months: u32) -> Money {
    let mut balance = principal;
    let mut interest = Decimal::ZERO;
    for _ in 0..months {
        if balance <= Decimal::ZERO {
            break;
        }
        let split = payment_split(balance, rate, payment);
        interest += split.interest;
        balance -= split.principal;
    }
    interest
}

fn pros_and_cons(
    c: &RefinanceComparison,
    input: &RefinanceInput,
    current_rate: Percent,
    new_rate: Percent,
    cash_out: Money,
    cash_in: Money,
) -> (Vec<String>, Vec<String>) {
    let mut pros = Vec::new();
    let mut cons = Vec::new();
    let horizon = input.candidate.horizon_months;

    if c.monthly_savings > Decimal::ZERO {
        pros.push(format!("Lowers the monthly payment by {:.2}", c.monthly_savings));
    } else if c.monthly_savings < Decimal::ZERO {
        cons.push(format!("Raises the monthly payment by {:.2}", c.monthly_savings.abs()));
    }

    match c.break_even_months {
        Some(months) if months <= Decimal::from(horizon) => {
            pros.push(format!("Closing costs are recovered in {months:.1} months"));
        }
        Some(months) => cons.push(format!(
            "Closing costs take {months:.1} months to recover, beyond the {horizon}-month horizon"
        )),
        None => cons.push("Closing costs are never recovered through payment savings".into()),
    }

    if new_rate < current_rate {
        pros.push(format!("Cuts the rate by {} points", current_rate - new_rate));
    } else if new_rate > current_rate {
        cons.push(format!("Raises the rate by {} points", new_rate - current_rate));
    }

    if cash_out > Decimal::ZERO {
        pros.push(format!("Frees {cash_out:.2} of equity"));
        cons.push(format!("Adds {cash_out:.2} to the loan balance"));
    }
    if cash_in > Decimal::ZERO {
        pros.push(format!("Pays the balance down by {cash_in:.2}"));
        cons.push(format!("Requires {cash_in:.2} in cash at closing"));
    }

    if input.candidate.term_years > input.current.remaining_term_years {
        cons.push(format!(
            "Extends the payoff by {} years",
            input.candidate.term_years - input.current.remaining_term_years
        ));
    }

    if c.lifetime_interest_change < Decimal::ZERO {
        pros.push(format!(
            "Saves {:.2} of interest over the life of the loan",
            c.lifetime_interest_change.abs()
        ));
    } else if c.lifetime_interest_change > Decimal::ZERO {
        cons.push(format!(
            "Costs {:.2} more interest over the life of the loan",
            c.lifetime_interest_change
        ));
    }

    if c.new_ltv > dec!(75) {
        cons.push(format!("LTV of {:.1}% may carry pricing adjustments", c.new_ltv));
    }

    (pros, cons)
}

/// 1-10 score from leverage, credit, cash-out and the savings sign.
pub fn refinance_risk_score(
    new_ltv: Percent,
    credit_score: u32,
    cash_out: Money,
    monthly_savings: Money,
) -> u32 {
    let mut score: i32 = 5;

    if new_ltv > dec!(75) {
        score += 2;
    } else if new_ltv > dec!(70) {
        score += 1;
    } else if new_ltv <= dec!(60) {
        score -= 1;
    }

    score += match credit_score {
        0..=619 => 3,
        620..=679 => 2,
        680..=739 => 1,
        740..=759 => 0,
        _ => -1,
    };

    if cash_out > Decimal::ZERO {
        score += 1;
    }
    if monthly_savings <= Decimal::ZERO {
        score += 2;
    }

    score.clamp(1, 10) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn scenario() -> RefinanceInput {
        RefinanceInput {
            current: CurrentLoan {
                balance: dec!(200000),
                annual_interest_rate: dec!(6.5),
                monthly_payment: None,
                remaining_term_years: 30,
                property_value: dec!(250000),
            },
            candidate: RefinanceCandidate {
                new_rate: dec!(5.5),
                term_years: 30,
                closing_cost_percent: dec!(3),
                kind: RefinanceKind::RateAndTerm,
                horizon_months: 60,
                discount_rate_percent: None,
            },
            credit_score: 720,
        }
    }

    fn approved(input: &RefinanceInput) -> RefinanceComparison {
        match compare_refinance(input, &AnalysisSettings::default())
            .unwrap()
            .result
        {
            RefinanceOutcome::Approved(c) => c,
            other => panic!("expected approval, got {other:?}"),
        }
    }

    #[test]
    fn test_rate_and_term_known_answer() {
        let c = approved(&scenario());
        assert!(
            (c.monthly_savings - dec!(128.56)).abs() < dec!(0.01),
            "savings {}",
            c.monthly_savings
        );
        assert_eq!(c.new_ltv, dec!(80));
        assert_eq!(c.closing_costs, dec!(6000));
        let be = c.break_even_months.unwrap();
        assert!((be - dec!(46.67)).abs() < dec!(0.01), "break-even {be}");
        // 128.56 * 60 - 6000
        assert!((c.total_savings_over_horizon - dec!(1713.6)).abs() < dec!(1));
        assert!(c.lifetime_interest_change < Decimal::ZERO);
    }

    #[test]
    fn test_out_of_range_terms_rejected() {
        let mut long_current = scenario();
        long_current.current.remaining_term_years = 1200;
        assert!(compare_refinance(&long_current, &AnalysisSettings::default()).is_err());

        let mut zero_term = scenario();
        zero_term.candidate.term_years = 0;
        assert!(compare_refinance(&zero_term, &AnalysisSettings::default()).is_err());

        let mut long_horizon = scenario();
        long_horizon.candidate.horizon_months = MAX_HORIZON_MONTHS + 1;
        assert!(compare_refinance(&long_horizon, &AnalysisSettings::default()).is_err());
    }

    #[test]
    fn test_npv_below_undiscounted_total() {
        let c = approved(&scenario());
        assert!(c.net_present_value < c.total_savings_over_horizon);
        assert!(c.net_present_value > Decimal::ZERO);
    }

    #[test]
    fn test_higher_rate_has_no_break_even() {
        let mut worse = scenario();
        worse.candidate.new_rate = dec!(7.5);
        let c = approved(&worse);
        assert!(c.monthly_savings < Decimal::ZERO);
        assert_eq!(c.break_even_months, None);
        assert!(c.cons.iter().any(|s| s.contains("never recovered")));
    }

    #[test]
    fn test_cash_out_over_ceiling_not_allowed() {
        let mut cash_out = scenario();
        cash_out.candidate.kind = RefinanceKind::CashOut { amount: dec!(10000) };
        let out = compare_refinance(&cash_out, &AnalysisSettings::default()).unwrap();
        match out.result {
            RefinanceOutcome::NotAllowed { new_ltv, max_ltv, .. } => {
                assert_eq!(new_ltv, dec!(84));
                assert_eq!(max_ltv, dec!(80));
            }
            other => panic!("expected NotAllowed, got {other:?}"),
        }
    }

    #[test]
    fn test_cash_in_lowers_principal() {
        let mut cash_in = scenario();
        cash_in.candidate.kind = RefinanceKind::CashIn { amount: dec!(50000) };
        let c = approved(&cash_in);
        assert_eq!(c.new_principal, dec!(150000));
        assert_eq!(c.new_ltv, dec!(60));
        assert!(c.pros.iter().any(|s| s.contains("Pays the balance down")));
    }

    #[test]
    fn test_risk_score_rules() {
        // LTV 80 (+2), credit 720 (+1)
        assert_eq!(refinance_risk_score(dec!(80), 720, Decimal::ZERO, dec!(100)), 8);
        assert_eq!(refinance_risk_score(dec!(50), 800, Decimal::ZERO, dec!(100)), 3);
        assert_eq!(refinance_risk_score(dec!(80), 580, dec!(1), dec!(-5)), 10);
    }

    #[test]
    fn test_outcome_serializes_with_tag() {
        let out = compare_refinance(&scenario(), &AnalysisSettings::default()).unwrap();
        let json = serde_json::to_value(&out.result).unwrap();
        assert_eq!(json["outcome"], "Approved");
        assert!(json.get("monthly_savings").is_some());
    }

    #[test]
    fn test_zero_property_value_rejected() {
        let mut bad = scenario();
        bad.current.property_value = Decimal::ZERO;
        assert!(compare_refinance(&bad, &AnalysisSettings::default()).is_err());
    }
}
