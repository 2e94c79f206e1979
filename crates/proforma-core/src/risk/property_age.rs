use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Lifespan assumed for a building's major systems.
pub const DEFAULT_EXPECTED_LIFESPAN: u32 = 50;

/// Share of the lifespan after which the age penalty applies.
const AGE_PENALTY_SHARE: Decimal = dec!(0.75);

/// Cost and efficiency multipliers that follow from a building's age.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyAgeFactors {
    pub age: u32,
    pub maintenance_cost_multiplier: Decimal,
    pub utility_efficiency_multiplier: Decimal,
    pub insurance_cost_multiplier: Decimal,
    pub expected_lifespan: u32,
}

impl Default for PropertyAgeFactors {
    fn default() -> Self {
        PropertyAgeFactors::for_age(0)
    }
}

impl PropertyAgeFactors {
    /// Multipliers by age band:
    ///
    /// | age      | maintenance | utility | insurance |
    /// |----------|-------------|---------|-----------|
    /// | 0-5      | 1.00        | 1.00    | 1.00      |
    /// | 6-15     | 1.10        | 0.95    | 1.05      |
    /// | 16-30    | 1.25        | 0.85    | 1.15      |
    /// | 31-50    | 1.50        | 0.75    | 1.30      |
    /// | over 50  | 1.80        | 0.65    | 1.50      |
    pub fn for_age(age: u32) -> Self {
        let (maintenance, utility, insurance) = match age {
            0..=5 => (dec!(1.00), dec!(1.00), dec!(1.00)),
            6..=15 => (dec!(1.10), dec!(0.95), dec!(1.05)),
            16..=30 => (dec!(1.25), dec!(0.85), dec!(1.15)),
            31..=50 => (dec!(1.50), dec!(0.75), dec!(1.30)),
            _ => (dec!(1.80), dec!(0.65), dec!(1.50)),
        };
        PropertyAgeFactors {
            age,
            maintenance_cost_multiplier: maintenance,
            utility_efficiency_multiplier: utility,
            insurance_cost_multiplier: insurance,
            expected_lifespan: DEFAULT_EXPECTED_LIFESPAN,
        }
    }

    /// Non-positive multipliers are replaced by 1.0.
    pub fn sanitized(&self, warnings: &mut Vec<String>) -> PropertyAgeFactors {
        let fix = |name: &str, v: Decimal, warnings: &mut Vec<String>| {
            if v <= Decimal::ZERO {
                tracing::warn!(multiplier = name, %v, "non-positive age multiplier replaced");
                warnings.push(format!(
                    "Property {name} multiplier {v} must be positive; using 1.0"
                ));
                Decimal::ONE
            } else {
                v
            }
        };
        PropertyAgeFactors {
            age: self.age,
            maintenance_cost_multiplier: fix(
                "maintenance",
                self.maintenance_cost_multiplier,
                warnings,
            ),
            utility_efficiency_multiplier: fix(
                "utility",
                self.utility_efficiency_multiplier,
                warnings,
            ),
            insurance_cost_multiplier: fix("insurance", self.insurance_cost_multiplier, warnings),
            expected_lifespan: self.expected_lifespan,
        }
    }

    /// True once the building is past 75% of its expected lifespan.
    pub fn past_age_threshold(&self) -> bool {
        self.expected_lifespan > 0
            && Decimal::from(self.age) > Decimal::from(self.expected_lifespan) * AGE_PENALTY_SHARE
    }

    /// Remaining life as a percent of the lifespan, floored at zero.
    pub fn remaining_life_percent(&self) -> Option<Decimal> {
        if self.expected_lifespan == 0 {
            return None;
        }
        let lifespan = Decimal::from(self.expected_lifespan);
        let remaining = (lifespan - Decimal::from(self.age)).max(Decimal::ZERO);
        Some(remaining / lifespan * dec!(100))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_new_property_is_neutral() {
        let f = PropertyAgeFactors::for_age(2);
        assert_eq!(f.maintenance_cost_multiplier, dec!(1));
        assert_eq!(f.insurance_cost_multiplier, dec!(1));
        assert!(!f.past_age_threshold());
    }

    #[test]
    fn test_age_threshold_is_strict() {
        // 75% of 50 is 37.5
        assert!(!PropertyAgeFactors::for_age(37).past_age_threshold());
        assert!(PropertyAgeFactors::for_age(38).past_age_threshold());
    }

    #[test]
    fn test_bands_grow_costlier_with_age() {
        let young = PropertyAgeFactors::for_age(10);
        let old = PropertyAgeFactors::for_age(60);
        assert!(old.maintenance_cost_multiplier > young.maintenance_cost_multiplier);
        assert!(old.utility_efficiency_multiplier < young.utility_efficiency_multiplier);
        assert_eq!(old.remaining_life_percent(), Some(Decimal::ZERO));
        assert_eq!(young.remaining_life_percent(), Some(dec!(80)));
    }

    #[test]
    fn test_sanitized_replaces_zero_multiplier() {
        let mut f = PropertyAgeFactors::for_age(20);
        f.insurance_cost_multiplier = Decimal::ZERO;
        let mut w = Vec::new();
        let s = f.sanitized(&mut w);
        assert_eq!(s.insurance_cost_multiplier, Decimal::ONE);
        assert_eq!(w.len(), 1);
    }
}
