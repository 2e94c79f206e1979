use proforma_core::debt::amortization::{build_amortization, AmortizationInput};
use proforma_core::deal::{analyze_deal, DealAnalysisInput, DealAnalysisRequest, RiskAssessment};
use proforma_core::market::{MarketConditions, MarketPreset};
use proforma_core::operating::expenses::{compute_operating_expenses, OperatingInput};
use proforma_core::operating::income::IncomeSource;
use proforma_core::returns::metrics::{analyze_returns, compute_return_metrics};
use proforma_core::returns::projection::project_pro_forma;
use proforma_core::risk::property_age::PropertyAgeFactors;
use proforma_core::risk::scoring::RiskFactors;
use proforma_core::settings::{AnalysisSettings, ExpenseBasis};
use proforma_core::types::{LoanTerms, OperatingAssumptions, OperationType, PropertyType};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn duplex() -> DealAnalysisInput {
    serde_json::from_value(serde_json::json!({
        "deal": {
            "purchase_price": "325000",
            "listed_price": "340000",
            "down_payment": "65000",
            "closing_costs": "6500",
            "rehab_costs": "8000",
            "units": 2,
            "property_type": "MultiFamily",
            "operation_type": "BuyAndHold",
            "finance_type": "Conventional",
            "cash_reserves": "10000"
        },
        "loan": { "annual_interest_rate": "6.5", "amortization_years": 30 },
        "income": { "flat_monthly_income": "3400" },
        "operating": {
            "maintenance": "5",
            "vacancy": "5",
            "management": "8",
            "cap_ex": "5",
            "op_ex": "2",
            "fixed_monthly_costs": "450"
        }
    }))
    .unwrap()
}

// ===========================================================================
// Loan sizing
// ===========================================================================

#[test]
fn test_scenario_one_loan_and_ltv() {
    let out = analyze_returns(&duplex(), &AnalysisSettings::default()).unwrap();
    assert_eq!(out.result.loan_amount, dec!(260000));
    assert_eq!(out.result.ltv, Some(dec!(80.0)));
}

#[test]
fn test_more_down_payment_lowers_loan_and_ltv() {
    let settings = AnalysisSettings::default();
    let mut prev = analyze_returns(&duplex(), &settings).unwrap().result;
    for down in [dec!(80000), dec!(120000), dec!(200000)] {
        let mut input = duplex();
        input.deal.down_payment = down;
        let next = analyze_returns(&input, &settings).unwrap().result;
        assert!(next.loan_amount < prev.loan_amount);
        assert!(next.ltv.unwrap() < prev.ltv.unwrap());
        prev = next;
    }
}

#[test]
fn test_down_payment_above_price_rejected() {
    let mut input = duplex();
    input.deal.down_payment = dec!(400000);
    assert!(analyze_returns(&input, &AnalysisSettings::default()).is_err());
}

#[test]
fn test_negative_price_rejected() {
    let mut input = duplex();
    input.deal.purchase_price = dec!(-1);
    input.deal.down_payment = Decimal::ZERO;
    assert!(analyze_returns(&input, &AnalysisSettings::default()).is_err());
}

// ===========================================================================
// Metrics
// ===========================================================================

#[test]
fn test_repeated_calls_are_identical() {
    let settings = AnalysisSettings::default();
    let a = analyze_returns(&duplex(), &settings).unwrap().result;
    let b = analyze_returns(&duplex(), &settings).unwrap().result;
    assert_eq!(
        serde_json::to_value(&a).unwrap(),
        serde_json::to_value(&b).unwrap()
    );
}

#[test]
fn test_discount_to_list() {
    let out = analyze_returns(&duplex(), &AnalysisSettings::default()).unwrap();
    // (340000 - 325000) / 340000
    let discount = out.result.discount_to_list.unwrap();
    assert!((discount - dec!(4.4118)).abs() < dec!(0.001));
}

#[test]
fn test_legacy_basis_reproduces_fixed_dollar_formula() {
    let settings = AnalysisSettings::legacy_parity();
    let out = analyze_returns(&duplex(), &settings).unwrap().result;
    // (5+5+8+5+2) * 1000 = 25000 a month of "fixed" cost
    assert_eq!(out.annual_noi, (dec!(3400) - dec!(25000)) * dec!(12));
    assert!(out.cap_rate.unwrap() < Decimal::ZERO);
    // rehab counted twice into project cost
    assert_eq!(out.total_project_cost, dec!(347500));
}

#[test]
fn test_statement_and_bundle_entry_points_agree() {
    let input = duplex();
    let settings = AnalysisSettings::default();
    let statement = compute_operating_expenses(
        &OperatingInput {
            income: input.income.clone(),
            operation_type: input.deal.operation_type,
            property_type: input.deal.property_type,
            operating: input.operating.clone(),
        },
        &settings,
    )
    .unwrap()
    .result;
    let direct = compute_return_metrics(&input.deal, input.loan.as_ref(), &statement, &settings)
        .unwrap()
        .result;
    let bundled = analyze_returns(&input, &settings).unwrap().result;
    assert_eq!(direct.annual_noi, bundled.annual_noi);
    assert_eq!(direct.cash_on_cash, bundled.cash_on_cash);
    assert_eq!(direct.npv, bundled.npv);
}

#[test]
fn test_short_term_rental_uses_room_revenue() {
    let mut input = duplex();
    input.deal.operation_type = OperationType::ShortTermRental;
    input.income = serde_json::from_value(serde_json::json!({
        "revenue_model": {
            "total_rooms": 2,
            "average_daily_rate": "120",
            "occupancy_rate": "65",
            "fixed_annual_costs": "6000"
        }
    }))
    .unwrap();
    let out = analyze_returns(&input, &AnalysisSettings::default()).unwrap().result;
    // income 2 * 120 * 0.65 * 30 = 4680; variable 25% = 1170; fixed 450 + 500
    assert_eq!(out.annual_noi, dec!(30720));
    // (1170 + 950) * 12 over 2 * 120 * 30 * 12 of potential
    let be = out.break_even_occupancy.unwrap();
    assert!((be - dec!(29.4444)).abs() < dec!(0.001), "break-even {be}");
}

#[test]
fn test_hotel_without_revenue_model_rejected() {
    let mut input = duplex();
    input.deal.property_type = PropertyType::Hotel;
    input.income = IncomeSource::flat(dec!(3400));
    assert!(analyze_returns(&input, &AnalysisSettings::default()).is_err());
}

// ===========================================================================
// Projection
// ===========================================================================

#[test]
fn test_declining_market_projects_lower_sale() {
    let settings = AnalysisSettings::default();
    let base = project_pro_forma(&duplex(), &settings).unwrap().result;
    let mut declining = duplex();
    declining.market = MarketConditions::from_preset(MarketPreset::Declining);
    let down = project_pro_forma(&declining, &settings).unwrap().result;
    assert!(down.sale_price < base.sale_price);
    assert_eq!(down.growth.appreciation, dec!(1.5));
}

#[test]
fn test_projection_balance_declines() {
    let out = project_pro_forma(&duplex(), &AnalysisSettings::default())
        .unwrap()
        .result;
    let balances: Vec<Decimal> = out.years.iter().map(|y| y.loan_balance).collect();
    assert!(balances.windows(2).all(|w| w[1] < w[0]));
    assert_eq!(out.years.last().unwrap().loan_balance, out.sale_price - out.net_sale_proceeds);
}

// ===========================================================================
// One-shot analysis
// ===========================================================================

#[test]
fn test_analyze_deal_with_risk() {
    let request = DealAnalysisRequest {
        input: duplex(),
        risk: Some(RiskAssessment {
            factors: RiskFactors {
                market_volatility: 5,
                tenant_quality: 7,
                property_condition: 6,
                location_stability: 8,
                financing_risk: 4,
            },
            property_age: PropertyAgeFactors::for_age(0),
        }),
    };
    let out = analyze_deal(&request, &AnalysisSettings::default()).unwrap().result;
    assert_eq!(out.metrics.loan_amount, dec!(260000));
    assert_eq!(out.debt_service.principal, dec!(260000));
    assert_eq!(out.statement.expense_basis, ExpenseBasis::PercentOfIncome);
    assert_eq!(out.risk.unwrap().overall_risk_score, dec!(4.4));
}

#[test]
fn test_analyze_deal_request_reads_flat_json() {
    let mut json = serde_json::to_value(duplex()).unwrap();
    json["risk"] = serde_json::json!({
        "factors": {
            "market_volatility": 3,
            "tenant_quality": 8,
            "property_condition": 8,
            "location_stability": 8,
            "financing_risk": 3
        }
    });
    let request: DealAnalysisRequest = serde_json::from_value(json).unwrap();
    let out = analyze_deal(&request, &AnalysisSettings::default()).unwrap();
    assert!(out.result.risk.is_some());
}

#[test]
fn test_all_cash_deal_needs_no_loan_terms() {
    let mut input = duplex();
    input.deal.down_payment = input.deal.purchase_price;
    input.loan = None;
    input.operating = OperatingAssumptions {
        fixed_monthly_costs: Decimal::ZERO,
        ..input.operating
    };
    let out = analyze_returns(&input, &AnalysisSettings::default()).unwrap().result;
    assert_eq!(out.annual_debt_service, Decimal::ZERO);
    assert_eq!(out.dscr_year1, None);
    assert_eq!(out.annual_cash_flow, out.annual_noi);
}

#[test]
fn test_quoted_payment_overrides_amortization() {
    let mut input = duplex();
    input.loan = Some(LoanTerms {
        annual_interest_rate: dec!(6.5),
        monthly_payment: Some(dec!(1500)),
        amortization_years: None,
    });
    let out = analyze_returns(&input, &AnalysisSettings::default()).unwrap().result;
    assert_eq!(out.monthly_debt_service, dec!(1500));
    assert_eq!(out.annual_debt_service, dec!(18000));
}

// ===========================================================================
// Loan-term bounds
// ===========================================================================

#[test]
fn test_eighty_year_amortization_is_an_error() {
    let input = AmortizationInput {
        principal: dec!(100000),
        terms: LoanTerms {
            annual_interest_rate: dec!(100),
            monthly_payment: None,
            amortization_years: Some(80),
        },
    };
    assert!(build_amortization(&input).is_err());
}

#[test]
fn test_deal_with_out_of_range_term_is_an_error() {
    let settings = AnalysisSettings::default();
    for years in [0u32, 51, 1200, u32::MAX] {
        let mut input = duplex();
        input.loan = Some(LoanTerms {
            annual_interest_rate: dec!(6.5),
            monthly_payment: None,
            amortization_years: Some(years),
        });
        assert!(analyze_returns(&input, &settings).is_err(), "years {years}");
        let request = DealAnalysisRequest { input, risk: None };
        assert!(analyze_deal(&request, &settings).is_err(), "years {years}");
    }
}

#[test]
fn test_longest_allowed_term_still_analyzes() {
    let mut input = duplex();
    input.loan = Some(LoanTerms {
        annual_interest_rate: dec!(6.5),
        monthly_payment: None,
        amortization_years: Some(50),
    });
    let out = analyze_returns(&input, &AnalysisSettings::default()).unwrap().result;
    assert!(out.monthly_debt_service > Decimal::ZERO);
}
