use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

use crate::market::MarketConditions;
use crate::risk::property_age::PropertyAgeFactors;
use crate::settings::{AnalysisSettings, RiskWeights};
use crate::types::{with_metadata, ComputationOutput};
use crate::ProFormaResult;

const FACTOR_MIN: i32 = 1;
const FACTOR_MAX: i32 = 10;
const SCORE_MAX: Decimal = dec!(10);

/// Utility multiplier below which efficiency upgrades are suggested.
const POOR_UTILITY_EFFICIENCY: Decimal = dec!(0.8);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Five 1-10 factors. Tenant quality, location stability and property
/// condition: higher is better. Market volatility and financing risk: higher
/// is worse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactors {
    pub market_volatility: i32,
    pub tenant_quality: i32,
    pub property_condition: i32,
    pub location_stability: i32,
    pub financing_risk: i32,
}

impl RiskFactors {
    /// Copy with every factor clamped into [1, 10].
    pub fn clamped(&self, warnings: &mut Vec<String>) -> RiskFactors {
        let clamp = |name: &str, v: i32, warnings: &mut Vec<String>| {
            let c = v.clamp(FACTOR_MIN, FACTOR_MAX);
            if c != v {
                tracing::warn!(factor = name, value = v, clamped = c, "risk factor clamped");
                warnings.push(format!("{name} of {v} is outside 1-10 and was clamped to {c}"));
            }
            c
        };
        RiskFactors {
            market_volatility: clamp("market_volatility", self.market_volatility, warnings),
            tenant_quality: clamp("tenant_quality", self.tenant_quality, warnings),
            property_condition: clamp("property_condition", self.property_condition, warnings),
            location_stability: clamp("location_stability", self.location_stability, warnings),
            financing_risk: clamp("financing_risk", self.financing_risk, warnings),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskCategory {
    #[serde(rename = "Low Risk")]
    Low,
    #[serde(rename = "Medium Risk")]
    Medium,
    #[serde(rename = "High Risk")]
    High,
    #[serde(rename = "Very High Risk")]
    VeryHigh,
}

impl RiskCategory {
    /// <= 3 Low, <= 5 Medium, <= 7 High, above 7 Very High.
    pub fn from_score(score: Decimal) -> Self {
        if score <= dec!(3) {
            RiskCategory::Low
        } else if score <= dec!(5) {
            RiskCategory::Medium
        } else if score <= dec!(7) {
            RiskCategory::High
        } else {
            RiskCategory::VeryHigh
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskCategory::Low => "Low Risk",
            RiskCategory::Medium => "Medium Risk",
            RiskCategory::High => "High Risk",
            RiskCategory::VeryHigh => "Very High Risk",
        };
        f.write_str(label)
    }
}

/// Four sub-scores, each within [0, 10].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskBreakdown {
    pub market_risk: Decimal,
    pub property_risk: Decimal,
    pub tenant_risk: Decimal,
    pub financing_risk: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskScoreInput {
    pub factors: RiskFactors,
    #[serde(default)]
    pub market: MarketConditions,
    /// Defaults to a new building
    #[serde(default)]
    pub property_age: PropertyAgeFactors,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskScoreResult {
    /// Weighted composite, one decimal place
    pub overall_risk_score: Decimal,
    pub risk_category: RiskCategory,
    pub risk_breakdown: RiskBreakdown,
    pub recommendations: Vec<String>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Weighted risk score with category and recommendations.
pub fn calculate_risk_score(
    input: &RiskScoreInput,
    settings: &AnalysisSettings,
) -> ProFormaResult<ComputationOutput<RiskScoreResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    tracing::debug!(
        preset = ?input.market.preset,
        age = input.property_age.age,
        "scoring deal risk"
    );

    settings.validate()?;
    let result = score_risk(input, settings, &mut warnings);

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        &methodology(&settings.risk_weights),
        input,
        warnings,
        elapsed,
        result,
    ))
}

/// Methodology label naming each category's share of the composite.
fn methodology(weights: &RiskWeights) -> String {
    let total = weights.total();
    let share = |w: Decimal| (w / total * dec!(100)).round_dp(1).normalize();
    format!(
        "Weighted Risk Score (market {}%, property {}%, tenant {}%, financing {}%)",
        share(weights.market),
        share(weights.property),
        share(weights.tenant),
        share(weights.financing),
    )
}

/// Sub-scores before weighting.
pub fn risk_breakdown(
    factors: &RiskFactors,
    market: &MarketConditions,
    age: &PropertyAgeFactors,
) -> RiskBreakdown {
    let volatility = Decimal::from(factors.market_volatility);
    let location = Decimal::from(factors.location_stability);
    let condition = Decimal::from(factors.property_condition);
    let tenant = Decimal::from(factors.tenant_quality);
    let financing = Decimal::from(factors.financing_risk);
    let eleven = dec!(11);

    let market_risk = (dec!(0.6) * volatility + dec!(0.4) * (eleven - location))
        * (market.vacancy_adjustment + market.cap_rate_adjustment)
        / dec!(2);

    let mut property_risk = (eleven - condition)
        * (age.maintenance_cost_multiplier + age.insurance_cost_multiplier)
        / dec!(2);
    if age.past_age_threshold() {
        property_risk += Decimal::ONE;
    }

    let tenant_risk = (eleven - tenant) * market.vacancy_adjustment;
    let financing_risk = financing * market.cap_rate_adjustment;

    RiskBreakdown {
        market_risk: bound(market_risk),
        property_risk: bound(property_risk),
        tenant_risk: bound(tenant_risk),
        financing_risk: bound(financing_risk),
    }
}

pub(crate) fn score_risk(
    input: &RiskScoreInput,
    settings: &AnalysisSettings,
    warnings: &mut Vec<String>,
) -> RiskScoreResult {
    let factors = input.factors.clamped(warnings);
    let market = input.market.sanitized(warnings);
    let age = input.property_age.sanitized(warnings);

    let breakdown = risk_breakdown(&factors, &market, &age);
    let w = &settings.risk_weights;
    let weighted = (w.market * breakdown.market_risk
        + w.property * breakdown.property_risk
        + w.tenant * breakdown.tenant_risk
        + w.financing * breakdown.financing_risk)
        / w.total();
    let overall_risk_score =
        bound(weighted).round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);
    let risk_category = RiskCategory::from_score(overall_risk_score);

    let recommendations =
        build_recommendations(&breakdown, &age, overall_risk_score, settings);

    RiskScoreResult {
        overall_risk_score,
        risk_category,
        risk_breakdown: breakdown,
        recommendations,
    }
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

fn bound(score: Decimal) -> Decimal {
    score.clamp(Decimal::ZERO, SCORE_MAX)
}

fn build_recommendations(
    breakdown: &RiskBreakdown,
    age: &PropertyAgeFactors,
    overall: Decimal,
    settings: &AnalysisSettings,
) -> Vec<String> {
    let trigger = settings.recommendation_trigger;
    let mut recs = Vec::new();

    if breakdown.market_risk > trigger {
        recs.push(
            "Stress-test rent and exit cap rate assumptions against a market downturn".to_string(),
        );
    }
    if breakdown.property_risk > trigger {
        recs.push(
            "Commission a full property inspection and budget additional capital reserves"
                .to_string(),
        );
    }
    if breakdown.tenant_risk > trigger {
        recs.push(
            "Tighten tenant screening on credit, income and rental history".to_string(),
        );
    }
    if breakdown.financing_risk > trigger {
        recs.push(
            "Reduce leverage or lock a fixed rate to lower financing exposure".to_string(),
        );
    }
    if age.past_age_threshold() {
        recs.push(format!(
            "Plan for major system replacements: at {} years the property is past 75% \
             of its {}-year lifespan",
            age.age, age.expected_lifespan
        ));
    }
    if age.utility_efficiency_multiplier < POOR_UTILITY_EFFICIENCY {
        recs.push("Evaluate energy-efficiency upgrades to cut utility costs".to_string());
    }

    if recs.is_empty() && overall > settings.needs_attention_threshold {
        let (name, score) = [
            ("market", breakdown.market_risk),
            ("property", breakdown.property_risk),
            ("tenant", breakdown.tenant_risk),
            ("financing", breakdown.financing_risk),
        ]
        .into_iter()
        .fold(("market", Decimal::MIN), |best, cur| {
            if cur.1 > best.1 {
                cur
            } else {
                best
            }
        });
        recs.push(format!(
            "Monitor {name} risk, the largest contributor at {:.1} of 10",
            score
        ));
    }

    recs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::MarketPreset;
    use pretty_assertions::assert_eq;
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

    fn score(input: &RiskScoreInput) -> RiskScoreResult {
        calculate_risk_score(input, &AnalysisSettings::default())
            .unwrap()
            .result
    }

    #[test]
    fn test_medium_risk_known_answer() {
        let result = score(&RiskScoreInput {
            factors: factors(5, 7, 6, 8, 4),
            market: MarketConditions::default(),
            property_age: PropertyAgeFactors::for_age(0),
        });
        // 0.3 * 4.2 + 0.3 * 5 + 0.2 * 4 + 0.2 * 4 = 4.36
        assert_eq!(result.risk_breakdown.market_risk, dec!(4.2));
        assert_eq!(result.risk_breakdown.property_risk, dec!(5));
        assert_eq!(result.overall_risk_score, dec!(4.4));
        assert_eq!(result.risk_category, RiskCategory::Medium);
        // Nothing above 6, so the fallback names the largest sub-score.
        assert_eq!(result.recommendations.len(), 1);
        assert!(result.recommendations[0].contains("property"));
    }

    #[test]
    fn test_methodology_reports_configured_weights() {
        let input = RiskScoreInput {
            factors: factors(5, 7, 6, 8, 4),
            market: MarketConditions::default(),
            property_age: PropertyAgeFactors::for_age(0),
        };
        let out = calculate_risk_score(&input, &AnalysisSettings::default()).unwrap();
        assert_eq!(
            out.methodology,
            "Weighted Risk Score (market 30%, property 30%, tenant 20%, financing 20%)"
        );

        let mut settings = AnalysisSettings::default();
        settings.risk_weights = RiskWeights {
            market: dec!(0.5),
            property: dec!(0.25),
            tenant: dec!(0.125),
            financing: dec!(0.125),
        };
        let out = calculate_risk_score(&input, &settings).unwrap();
        assert_eq!(
            out.methodology,
            "Weighted Risk Score (market 50%, property 25%, tenant 12.5%, financing 12.5%)"
        );
    }

    #[test]
    fn test_category_thresholds() {
        assert_eq!(RiskCategory::from_score(dec!(3.0)), RiskCategory::Low);
        assert_eq!(RiskCategory::from_score(dec!(3.1)), RiskCategory::Medium);
        assert_eq!(RiskCategory::from_score(dec!(5.0)), RiskCategory::Medium);
        assert_eq!(RiskCategory::from_score(dec!(7.0)), RiskCategory::High);
        assert_eq!(RiskCategory::from_score(dec!(7.1)), RiskCategory::VeryHigh);
        assert_eq!(RiskCategory::VeryHigh.to_string(), "Very High Risk");
    }

    #[test]
    fn test_low_risk_has_no_recommendations() {
        let result = score(&RiskScoreInput {
            factors: factors(2, 9, 9, 9, 2),
            market: MarketConditions::default(),
            property_age: PropertyAgeFactors::for_age(3),
        });
        assert!(result.overall_risk_score <= dec!(3));
        assert_eq!(result.risk_category, RiskCategory::Low);
        assert!(result.recommendations.is_empty());
    }

    #[test]
    fn test_worst_case_stays_bounded() {
        let result = score(&RiskScoreInput {
            factors: factors(10, 1, 1, 1, 10),
            market: MarketConditions::from_preset(MarketPreset::Declining),
            property_age: PropertyAgeFactors::for_age(80),
        });
        assert_eq!(result.risk_breakdown.property_risk, dec!(10));
        assert_eq!(result.overall_risk_score, dec!(10));
        assert_eq!(result.risk_category, RiskCategory::VeryHigh);
        assert!(result.recommendations.len() >= 5);
    }

    #[test]
    fn test_out_of_range_factors_clamped() {
        let out = calculate_risk_score(
            &RiskScoreInput {
                factors: factors(0, 15, 6, 8, 4),
                market: MarketConditions::default(),
                property_age: PropertyAgeFactors::default(),
            },
            &AnalysisSettings::default(),
        )
        .unwrap();
        assert_eq!(out.warnings.len(), 2);
        // clamped to 1 and 10
        assert_eq!(out.result.risk_breakdown.tenant_risk, dec!(1));
    }

    #[test]
    fn test_serialized_category_uses_display_string() {
        let json = serde_json::to_value(RiskCategory::High).unwrap();
        assert_eq!(json, serde_json::json!("High Risk"));
    }
}
