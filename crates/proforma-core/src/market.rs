use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Named market regime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketPreset {
    #[default]
    Stable,
    Growing,
    Declining,
    Volatile,
}

/// Multipliers a market regime applies to the base assumptions. 1.0 leaves
/// an assumption unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketConditions {
    pub preset: MarketPreset,
    pub vacancy_adjustment: Decimal,
    pub rent_growth_adjustment: Decimal,
    pub appreciation_adjustment: Decimal,
    pub cap_rate_adjustment: Decimal,
}

impl MarketConditions {
    pub fn from_preset(preset: MarketPreset) -> Self {
        let (vacancy, rent_growth, appreciation, cap_rate) = match preset {
            MarketPreset::Stable => (dec!(1.0), dec!(1.0), dec!(1.0), dec!(1.0)),
            MarketPreset::Growing => (dec!(0.8), dec!(1.3), dec!(1.4), dec!(0.95)),
            MarketPreset::Declining => (dec!(1.4), dec!(0.6), dec!(0.5), dec!(1.15)),
            MarketPreset::Volatile => (dec!(1.2), dec!(1.0), dec!(0.9), dec!(1.1)),
        };
        MarketConditions {
            preset,
            vacancy_adjustment: vacancy,
            rent_growth_adjustment: rent_growth,
            appreciation_adjustment: appreciation,
            cap_rate_adjustment: cap_rate,
        }
    }

    /// Copy with non-positive multipliers reset to 1.0.
    pub fn sanitized(&self, warnings: &mut Vec<String>) -> MarketConditions {
        let fix = |name: &str, v: Decimal, warnings: &mut Vec<String>| {
            if v <= Decimal::ZERO {
                warnings.push(format!("Market {name} adjustment {v} must be positive; using 1.0"));
                Decimal::ONE
            } else {
                v
            }
        };
        MarketConditions {
            preset: self.preset,
            vacancy_adjustment: fix("vacancy", self.vacancy_adjustment, warnings),
            rent_growth_adjustment: fix("rent growth", self.rent_growth_adjustment, warnings),
            appreciation_adjustment: fix("appreciation", self.appreciation_adjustment, warnings),
            cap_rate_adjustment: fix("cap rate", self.cap_rate_adjustment, warnings),
        }
    }
}

impl Default for MarketConditions {
    fn default() -> Self {
        MarketConditions::from_preset(MarketPreset::Stable)
    }
}

impl From<MarketPreset> for MarketConditions {
    fn from(preset: MarketPreset) -> Self {
        MarketConditions::from_preset(preset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable_is_neutral() {
        let m = MarketConditions::default();
        assert_eq!(m.preset, MarketPreset::Stable);
        assert_eq!(m.vacancy_adjustment, Decimal::ONE);
        assert_eq!(m.cap_rate_adjustment, Decimal::ONE);
    }

    #[test]
    fn test_preset_wire_names() {
        let p: MarketPreset = serde_json::from_str("\"declining\"").unwrap();
        assert_eq!(p, MarketPreset::Declining);
        assert!(MarketConditions::from(p).vacancy_adjustment > Decimal::ONE);
    }

    #[test]
    fn test_sanitized_resets_non_positive() {
        let mut m = MarketConditions::from_preset(MarketPreset::Growing);
        m.cap_rate_adjustment = Decimal::ZERO;
        let mut w = Vec::new();
        assert_eq!(m.sanitized(&mut w).cap_rate_adjustment, Decimal::ONE);
        assert_eq!(w.len(), 1);
    }
}
