use proforma_core::market::{MarketConditions, MarketPreset};
use proforma_core::risk::property_age::PropertyAgeFactors;
use proforma_core::risk::scoring::{calculate_risk_score, RiskCategory, RiskFactors, RiskScoreInput};
use proforma_core::settings::{AnalysisSettings, RiskWeights};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn factors(mv: i32, tq: i32, pc: i32, ls: i32, fr: i32) -> RiskFactors {
    RiskFactors {
        market_volatility: mv,
        tenant_quality: tq,
        property_condition: pc,
        location_stability: ls,
        financing_risk: fr,
    }
}

fn input(f: RiskFactors, preset: MarketPreset, age: u32) -> RiskScoreInput {
    RiskScoreInput {
        factors: f,
        market: MarketConditions::from_preset(preset),
        property_age: PropertyAgeFactors::for_age(age),
    }
}

#[test]
fn test_scenario_two_medium_risk() {
    let out = calculate_risk_score(
        &input(factors(5, 7, 6, 8, 4), MarketPreset::Stable, 0),
        &AnalysisSettings::default(),
    )
    .unwrap();
    assert_eq!(out.result.overall_risk_score, dec!(4.4));
    assert_eq!(out.result.risk_category, RiskCategory::Medium);
    assert_eq!(
        serde_json::to_value(&out.result).unwrap()["risk_category"],
        "Medium Risk"
    );
}

#[test]
fn test_default_weights_are_pinned() {
    let w = RiskWeights::default();
    assert_eq!(
        (w.market, w.property, w.tenant, w.financing),
        (dec!(0.30), dec!(0.30), dec!(0.20), dec!(0.20))
    );
}

#[test]
fn test_scores_bounded_and_categories_consistent() {
    let settings = AnalysisSettings::default();
    let presets = [
        MarketPreset::Stable,
        MarketPreset::Growing,
        MarketPreset::Declining,
        MarketPreset::Volatile,
    ];
    for preset in presets {
        for level in [1, 4, 7, 10] {
            for age in [0, 20, 60] {
                let result = calculate_risk_score(
                    &input(factors(level, 11 - level, 11 - level, 11 - level, level), preset, age),
                    &settings,
                )
                .unwrap()
                .result;
                let score = result.overall_risk_score;
                assert!(score >= Decimal::ZERO && score <= dec!(10), "score {score}");
                assert_eq!(result.risk_category, RiskCategory::from_score(score));
                let b = &result.risk_breakdown;
                for sub in [b.market_risk, b.property_risk, b.tenant_risk, b.financing_risk] {
                    assert!(sub >= Decimal::ZERO && sub <= dec!(10));
                }
                if score > settings.needs_attention_threshold {
                    assert!(!result.recommendations.is_empty());
                }
            }
        }
    }
}

#[test]
fn test_worse_market_never_lowers_score() {
    let settings = AnalysisSettings::default();
    let stable_input = input(factors(5, 7, 6, 8, 4), MarketPreset::Stable, 10);
    let stable = calculate_risk_score(&stable_input, &settings).unwrap().result;
    let declining =
        calculate_risk_score(&input(factors(5, 7, 6, 8, 4), MarketPreset::Declining, 10), &settings)
            .unwrap()
            .result;
    assert!(declining.overall_risk_score >= stable.overall_risk_score);
}

#[test]
fn test_old_property_adds_age_recommendation() {
    let result = calculate_risk_score(
        &input(factors(3, 8, 8, 8, 3), MarketPreset::Stable, 45),
        &AnalysisSettings::default(),
    )
    .unwrap()
    .result;
    assert!(result
        .recommendations
        .iter()
        .any(|r| r.contains("lifespan")));
}

#[test]
fn test_custom_weights_are_normalized() {
    let settings = AnalysisSettings {
        risk_weights: RiskWeights {
            market: dec!(1),
            property: dec!(1),
            tenant: dec!(1),
            financing: dec!(1),
        },
        ..AnalysisSettings::default()
    };
    let fresh = input(factors(5, 7, 6, 8, 4), MarketPreset::Stable, 0);
    let result = calculate_risk_score(&fresh, &settings).unwrap().result;
    // (4.2 + 5 + 4 + 4) / 4 = 4.3
    assert_eq!(result.overall_risk_score, dec!(4.3));
}

#[test]
fn test_input_defaults_from_json() {
    let input: RiskScoreInput = serde_json::from_str(
        r#"{"factors": {"market_volatility": 5, "tenant_quality": 7, "property_condition": 6,
            "location_stability": 8, "financing_risk": 4}}"#,
    )
    .unwrap();
    let out = calculate_risk_score(&input, &AnalysisSettings::default()).unwrap();
    assert_eq!(out.result.overall_risk_score, dec!(4.4));
}
