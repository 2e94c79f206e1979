//! Analysis settings shared by every calculation.
//!
//! Callers that need exact parity with the legacy Analyze workspace flip
//! the parity switches here; everyone else takes the defaults.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ProFormaError;
use crate::types::Percent;
use crate::ProFormaResult;

/// Whether rehab costs are added to total project cost a second time, as the
/// legacy Analyze UI does. Off by default.
pub const REHAB_COUNTED_TWICE: bool = false;

/// How the five operating percentages turn into monthly costs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpenseBasis {
    /// Percentages are percent of monthly income (variable bucket); only
    /// explicit fixed costs land in the fixed bucket.
    #[default]
    PercentOfIncome,
    /// Legacy Analyze UI formula: the percentage sum is read as dollars x 1000 and
    /// treated as a fixed monthly cost.
    LegacyFixedDollar,
}

/// Weights combining the four risk sub-scores into the overall score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskWeights {
    pub market: Decimal,
    pub property: Decimal,
    pub tenant: Decimal,
    pub financing: Decimal,
}

impl Default for RiskWeights {
    fn default() -> Self {
        RiskWeights {
            market: dec!(0.30),
            property: dec!(0.30),
            tenant: dec!(0.20),
            financing: dec!(0.20),
        }
    }
}

impl RiskWeights {
    pub fn total(&self) -> Decimal {
        self.market + self.property + self.tenant + self.financing
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    pub expense_basis: ExpenseBasis,
    pub rehab_counted_twice: bool,
    /// Income uplift applied for stabilized DSCR/ROE (percent)
    pub stabilized_income_uplift: Percent,
    /// Fixed-cost uplift applied for stabilized DSCR/ROE (percent)
    pub stabilized_fixed_cost_uplift: Percent,
    /// Annual discount rate for NPV of the levered cash flows (percent)
    pub discount_rate_percent: Percent,
    /// Highest LTV a refinance may reach (percent, inclusive)
    pub max_refinance_ltv: Percent,
    pub risk_weights: RiskWeights,
    /// Overall risk score above which recommendations are guaranteed
    pub needs_attention_threshold: Decimal,
    /// Sub-score above which a category-specific recommendation fires
    pub recommendation_trigger: Decimal,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        AnalysisSettings {
            expense_basis: ExpenseBasis::default(),
            rehab_counted_twice: REHAB_COUNTED_TWICE,
            stabilized_income_uplift: dec!(5),
            stabilized_fixed_cost_uplift: dec!(3),
            discount_rate_percent: dec!(8),
            max_refinance_ltv: dec!(80),
            risk_weights: RiskWeights::default(),
            needs_attention_threshold: dec!(3),
            recommendation_trigger: dec!(6),
        }
    }
}

impl AnalysisSettings {
    /// Settings that reproduce the legacy Analyze UI formulas exactly.
    pub fn legacy_parity() -> Self {
        AnalysisSettings {
            expense_basis: ExpenseBasis::LegacyFixedDollar,
            rehab_counted_twice: true,
            ..AnalysisSettings::default()
        }
    }

    pub fn validate(&self) -> ProFormaResult<()> {
        let w = &self.risk_weights;
        if [w.market, w.property, w.tenant, w.financing]
            .iter()
            .any(|x| *x < Decimal::ZERO)
        {
            return Err(ProFormaError::invalid(
                "risk_weights",
                "Risk weights cannot be negative",
            ));
        }
        if w.total().is_zero() {
            return Err(ProFormaError::invalid(
                "risk_weights",
                "At least one risk weight must be positive",
            ));
        }
        if self.max_refinance_ltv <= Decimal::ZERO || self.max_refinance_ltv > dec!(100) {
            return Err(ProFormaError::invalid(
                "max_refinance_ltv",
                "Maximum refinance LTV must be within (0, 100]",
            ));
        }
        if self.discount_rate_percent <= dec!(-100) {
            return Err(ProFormaError::invalid(
                "discount_rate_percent",
                "Discount rate must be greater than -100%",
            ));
        }
        Ok(())
    }
}
