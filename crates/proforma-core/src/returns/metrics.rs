use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::deal::{prepare_deal, DealAnalysisInput, PreparedDeal};
use crate::debt::amortization::{resolve_debt_service, DebtService};
use crate::error::ProFormaError;
use crate::market::MarketConditions;
use crate::operating::expenses::{break_even_occupancy, OperatingStatement};
use crate::returns::projection::build_projection;
use crate::settings::AnalysisSettings;
use crate::time_value::{closed_form_irr, npv, solve_irr};
use crate::types::{
    percent_of, ratio, with_metadata, ComputationOutput, DealInputs, LoanTerms, Money, Multiple,
    Percent, Years,
};
use crate::ProFormaResult;

/// DSCR below which most lenders decline the deal.
const MIN_LENDER_DSCR: Decimal = dec!(1.25);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Every derived return and valuation metric for one deal.
///
/// Ratios whose denominator is zero are `None` (serialized as `null`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnMetricsBundle {
    pub loan_amount: Money,
    pub total_project_cost: Money,
    pub total_cash_invested: Money,
    pub ltv: Option<Percent>,
    pub ltc: Option<Percent>,
    pub annual_noi: Money,
    pub stabilized_noi: Money,
    pub cap_rate: Option<Percent>,
    pub monthly_debt_service: Money,
    pub annual_debt_service: Money,
    pub monthly_cash_flow: Money,
    pub annual_cash_flow: Money,
    pub dscr_year1: Option<Multiple>,
    pub dscr_stabilized: Option<Multiple>,
    pub debt_yield: Option<Percent>,
    pub expense_ratio: Option<Percent>,
    pub noi_margin: Option<Percent>,
    pub gross_rent_multiplier: Option<Multiple>,
    pub break_even_occupancy: Option<Percent>,
    pub break_even_occupancy_with_debt: Option<Percent>,
    pub cash_on_cash: Option<Percent>,
    /// `None` when the deal does not cash flow
    pub payback_period_years: Option<Years>,
    pub equity_multiple: Option<Multiple>,
    /// Solved from the projected cash flows
    pub levered_irr: Option<Percent>,
    pub unlevered_irr: Option<Percent>,
    /// Single-compounding approximations of the two IRRs
    pub levered_irr_approx: Option<Percent>,
    pub unlevered_irr_approx: Option<Percent>,
    /// Levered cash flows discounted at the settings' discount rate
    pub npv: Money,
    pub roe_current: Option<Percent>,
    pub roe_stabilized: Option<Percent>,
    pub cash_reserve_months: Option<Decimal>,
    pub price_per_unit: Option<Money>,
    pub price_per_square_foot: Option<Money>,
    /// Discount of the purchase price to the listed price
    pub discount_to_list: Option<Percent>,
}

/// Echoed as assumptions by [`compute_return_metrics`].
#[derive(Serialize)]
struct ReturnMetricsAssumptions<'a> {
    deal: &'a DealInputs,
    loan: Option<&'a LoanTerms>,
    statement: &'a OperatingStatement,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Return metrics for a deal whose operating statement is already known.
///
/// Projection-based metrics (IRR, NPV) assume a stable market.
pub fn compute_return_metrics(
    deal: &DealInputs,
    loan: Option<&LoanTerms>,
    statement: &OperatingStatement,
    settings: &AnalysisSettings,
) -> ProFormaResult<ComputationOutput<ReturnMetricsBundle>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    tracing::debug!(purchase_price = %deal.purchase_price, "computing return metrics");

    settings.validate()?;
    deal.validate()?;

    let principal = deal.loan_amount();
    let debt = match loan {
        _ if principal.is_zero() => DebtService::none(),
        Some(terms) => resolve_debt_service(principal, terms, &mut warnings)?,
        None => {
            return Err(ProFormaError::invalid(
                "loan",
                "Loan terms are required when the down payment is below the purchase price",
            ));
        }
    };

    let prepared = PreparedDeal {
        statement: statement.clone(),
        debt,
        market: MarketConditions::default(),
    };
    let bundle = metrics_for(deal, &prepared, settings, &mut warnings)?;

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Return Metrics (cap rate, DSCR, cash-on-cash, IRR via Newton-Raphson)",
        &ReturnMetricsAssumptions {
            deal,
            loan,
            statement,
        },
        warnings,
        elapsed,
        bundle,
    ))
}

/// Income, expenses, debt service and return metrics from raw deal inputs.
pub fn analyze_returns(
    input: &DealAnalysisInput,
    settings: &AnalysisSettings,
) -> ProFormaResult<ComputationOutput<ReturnMetricsBundle>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    tracing::debug!(purchase_price = %input.deal.purchase_price, "analyzing returns");

    let prepared = prepare_deal(input, settings, &mut warnings)?;
    let bundle = metrics_for(&input.deal, &prepared, settings, &mut warnings)?;

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Return Metrics (cap rate, DSCR, cash-on-cash, IRR via Newton-Raphson)",
        input,
        warnings,
        elapsed,
        bundle,
    ))
}

/// Total project cost, counting rehab a second time when the parity switch
/// is on.
pub fn total_project_cost(deal: &DealInputs, settings: &AnalysisSettings) -> Money {
    let base = deal.purchase_price + deal.closing_costs + deal.rehab_costs;
    if settings.rehab_counted_twice {
        base + deal.rehab_costs
    } else {
        base
    }
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

pub(crate) fn metrics_for(
    deal: &DealInputs,
    prepared: &PreparedDeal,
    settings: &AnalysisSettings,
    warnings: &mut Vec<String>,
) -> ProFormaResult<ReturnMetricsBundle> {
    let statement = &prepared.statement;
    let debt = &prepared.debt;

    let loan = debt.principal;
    let project_cost = total_project_cost(deal, settings);
    let cash_invested = deal.total_cash_invested();
    let noi = statement.annual_noi;
    let annual_debt_service = debt.annual_debt_service;

    let annual_cash_flow = noi - annual_debt_service;
    let monthly_cash_flow = annual_cash_flow / dec!(12);

    // Stabilized year: income and the variable bucket grow together.
    let income_uplift = Decimal::ONE + settings.stabilized_income_uplift / dec!(100);
    let fixed_uplift = Decimal::ONE + settings.stabilized_fixed_cost_uplift / dec!(100);
    let stabilized_noi = dec!(12)
        * ((statement.monthly_income - statement.variable_monthly_ops) * income_uplift
            - statement.fixed_monthly_ops * fixed_uplift);
    let stabilized_cash_flow = stabilized_noi - annual_debt_service;

    let dscr_year1 = ratio(noi, annual_debt_service);
    if let Some(dscr) = dscr_year1 {
        if dscr < Decimal::ONE {
            warnings.push(format!("DSCR of {dscr:.2} does not cover debt service"));
        } else if dscr < MIN_LENDER_DSCR {
            warnings.push(format!(
                "DSCR of {dscr:.2} is below the {MIN_LENDER_DSCR} most lenders require"
            ));
        }
    }
    if annual_cash_flow < Decimal::ZERO {
        warnings.push(format!("Negative annual cash flow of {annual_cash_flow:.2}"));
    }

    let equity_at_purchase = deal.purchase_price - loan;
    let payback_period_years = if annual_cash_flow > Decimal::ZERO {
        ratio(cash_invested, annual_cash_flow)
    } else {
        None
    };

    let projection = build_projection(deal, prepared);
    let years = deal.holding_period_years;
    let (levered_irr, levered_irr_approx) = irr_with_approx(
        "levered",
        &projection.levered_cash_flows,
        cash_invested,
        years,
        warnings,
    );
    let all_in_cost = deal.purchase_price + deal.closing_costs + deal.rehab_costs;
    let (unlevered_irr, unlevered_irr_approx) = irr_with_approx(
        "unlevered",
        &projection.unlevered_cash_flows,
        all_in_cost,
        years,
        warnings,
    );
    let npv = npv(
        settings.discount_rate_percent / dec!(100),
        &projection.levered_cash_flows,
    )?;

    let monthly_outflow = statement.total_monthly_ops + debt.monthly_payment;
    let cash_reserve_months = if monthly_outflow > Decimal::ZERO {
        ratio(deal.cash_reserves, monthly_outflow)
    } else {
        None
    };

    let discount_to_list = deal
        .listed_price
        .and_then(|listed| percent_of(listed - deal.purchase_price, listed));

    Ok(ReturnMetricsBundle {
        loan_amount: loan,
        total_project_cost: project_cost,
        total_cash_invested: cash_invested,
        ltv: percent_of(loan, deal.purchase_price),
        ltc: percent_of(loan, project_cost),
        annual_noi: noi,
        stabilized_noi,
        cap_rate: percent_of(noi, deal.purchase_price),
        monthly_debt_service: debt.monthly_payment,
        annual_debt_service,
        monthly_cash_flow,
        annual_cash_flow,
        dscr_year1,
        dscr_stabilized: ratio(stabilized_noi, annual_debt_service),
        debt_yield: percent_of(noi, loan),
        expense_ratio: statement.expense_ratio,
        noi_margin: percent_of(noi, statement.gross_annual_income),
        gross_rent_multiplier: ratio(deal.purchase_price, statement.gross_annual_income),
        break_even_occupancy: break_even_occupancy(
            statement.annual_operating_expenses,
            statement.gross_potential_revenue,
        ),
        break_even_occupancy_with_debt: break_even_occupancy(
            statement.annual_operating_expenses + annual_debt_service,
            statement.gross_potential_revenue,
        ),
        cash_on_cash: percent_of(annual_cash_flow, cash_invested),
        payback_period_years,
        equity_multiple: ratio(annual_cash_flow * Decimal::from(years), cash_invested),
        levered_irr,
        unlevered_irr,
        levered_irr_approx,
        unlevered_irr_approx,
        npv,
        roe_current: percent_of(annual_cash_flow, equity_at_purchase),
        roe_stabilized: percent_of(stabilized_cash_flow, equity_at_purchase),
        cash_reserve_months,
        price_per_unit: ratio(deal.purchase_price, Decimal::from(deal.units)),
        price_per_square_foot: deal
            .square_footage
            .and_then(|sqft| ratio(deal.purchase_price, sqft)),
        discount_to_list,
    })
}

/// Solved IRR and its closed-form approximation, both in percent.
///
/// The approximation stands in for the solved figure when the solver fails.
fn irr_with_approx(
    label: &str,
    cash_flows: &[Money],
    investment: Money,
    years: u32,
    warnings: &mut Vec<String>,
) -> (Option<Percent>, Option<Percent>) {
    let total_return: Money = cash_flows.iter().sum();
    let approx = closed_form_irr(investment, total_return, years).map(|r| r * dec!(100));
    if investment <= Decimal::ZERO {
        return (None, approx);
    }

    match solve_irr(cash_flows) {
        Ok(rate) => (Some(rate * dec!(100)), approx),
        Err(e) => {
            tracing::warn!(label, error = %e, "IRR solve failed, using closed form");
            warnings.push(format!(
                "{label} IRR solver did not converge ({e}); reporting the closed-form approximation"
            ));
            (approx, approx)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operating::income::IncomeSource;
    use crate::types::OperatingAssumptions;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn input() -> DealAnalysisInput {
        DealAnalysisInput {
            deal: serde_json::from_value(serde_json::json!({
                "purchase_price": "325000",
                "down_payment": "65000",
                "closing_costs": "6500",
                "rehab_costs": "10000",
                "units": 2,
                "square_footage": "1625",
                "cash_reserves": "12000",
            }))
            .unwrap(),
            loan: Some(LoanTerms {
                annual_interest_rate: dec!(6.5),
                monthly_payment: None,
                amortization_years: Some(30),
            }),
            income: IncomeSource::flat(dec!(3200)),
            operating: OperatingAssumptions {
                maintenance: dec!(5),
                vacancy: dec!(5),
                management: dec!(8),
                cap_ex: dec!(5),
                op_ex: dec!(2),
                fixed_monthly_costs: dec!(400),
            },
            market: MarketConditions::default(),
        }
    }

    fn bundle(settings: &AnalysisSettings) -> ReturnMetricsBundle {
        analyze_returns(&input(), settings).unwrap().result
    }

    #[test]
    fn test_scenario_loan_and_ltv() {
        let b = bundle(&AnalysisSettings::default());
        assert_eq!(b.loan_amount, dec!(260000));
        assert_eq!(b.ltv, Some(dec!(80)));
        assert_eq!(b.total_cash_invested, dec!(81500));
        assert_eq!(b.total_project_cost, dec!(341500));
    }

    #[test]
    fn test_noi_and_cap_rate() {
        let b = bundle(&AnalysisSettings::default());
        // income 3200; variable 25% = 800; fixed 400 -> NOI 2000/month
        assert_eq!(b.annual_noi, dec!(24000));
        let cap = b.cap_rate.unwrap();
        assert!((cap - dec!(7.3846)).abs() < dec!(0.001), "cap {cap}");
        assert_eq!(b.gross_rent_multiplier.unwrap().round_dp(4), dec!(8.4635));
    }

    #[test]
    fn test_rehab_double_count_only_moves_ltc() {
        let base = bundle(&AnalysisSettings::default());
        let parity = bundle(&AnalysisSettings {
            rehab_counted_twice: true,
            ..AnalysisSettings::default()
        });
        assert_eq!(parity.total_project_cost, dec!(351500));
        assert!(parity.ltc.unwrap() < base.ltc.unwrap());
        assert_eq!(parity.ltv, base.ltv);
        assert_eq!(parity.total_cash_invested, base.total_cash_invested);
    }

    #[test]
    fn test_cash_flow_identities() {
        let b = bundle(&AnalysisSettings::default());
        assert_eq!(b.annual_cash_flow, b.annual_noi - b.annual_debt_service);
        assert_eq!(b.monthly_cash_flow * dec!(12), b.annual_cash_flow);
        let coc = b.cash_on_cash.unwrap();
        assert_eq!(coc, b.annual_cash_flow / dec!(81500) * dec!(100));
    }

    #[test]
    fn test_stabilized_exceeds_year_one() {
        let b = bundle(&AnalysisSettings::default());
        // (3200 - 800) * 1.05 - 400 * 1.03 = 2108 per month
        assert_eq!(b.stabilized_noi, dec!(25296));
        assert!(b.dscr_stabilized.unwrap() > b.dscr_year1.unwrap());
    }

    #[test]
    fn test_negative_cash_flow_has_no_payback() {
        let mut thin = input();
        thin.income = IncomeSource::flat(dec!(1800));
        let b = analyze_returns(&thin, &AnalysisSettings::default())
            .unwrap()
            .result;
        assert!(b.annual_cash_flow < Decimal::ZERO);
        assert_eq!(b.payback_period_years, None);
    }

    #[test]
    fn test_all_cash_ratios_not_applicable() {
        let mut cash = input();
        cash.deal.down_payment = cash.deal.purchase_price;
        cash.loan = None;
        let b = analyze_returns(&cash, &AnalysisSettings::default())
            .unwrap()
            .result;
        assert_eq!(b.dscr_year1, None);
        assert_eq!(b.debt_yield, None);
        assert_eq!(b.ltv, Some(Decimal::ZERO));
        assert!(b.levered_irr.is_some());
    }

    #[test]
    fn test_irr_tracks_approximation() {
        let b = bundle(&AnalysisSettings::default());
        let irr = b.levered_irr.unwrap();
        let approx = b.levered_irr_approx.unwrap();
        assert!(irr > Decimal::ZERO);
        // Interim cash flows make the solved IRR sit above the single-compounding figure.
        assert!(irr >= approx);
    }

    #[test]
    fn test_reserves_and_unit_pricing() {
        let b = bundle(&AnalysisSettings::default());
        assert_eq!(b.price_per_unit, Some(dec!(162500)));
        assert_eq!(b.price_per_square_foot, Some(dec!(200)));
        let months = b.cash_reserve_months.unwrap();
        assert!(months > Decimal::ZERO && months < dec!(12));
    }

    #[test]
    fn test_missing_loan_terms_rejected() {
        let mut no_terms = input();
        no_terms.loan = None;
        assert!(analyze_returns(&no_terms, &AnalysisSettings::default()).is_err());
    }

    #[test]
    fn test_statement_entry_point_matches_bundle() {
        let input = input();
        let full = analyze_returns(&input, &AnalysisSettings::default())
            .unwrap()
            .result;
        let prepared = {
            let mut w = Vec::new();
            prepare_deal(&input, &AnalysisSettings::default(), &mut w).unwrap()
        };
        let direct = compute_return_metrics(
            &input.deal,
            input.loan.as_ref(),
            &prepared.statement,
            &AnalysisSettings::default(),
        )
        .unwrap()
        .result;
        assert_eq!(direct.annual_cash_flow, full.annual_cash_flow);
        assert_eq!(direct.levered_irr, full.levered_irr);
    }
}
