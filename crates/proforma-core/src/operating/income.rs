use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::ProFormaError;
use crate::types::{
    clamp_percent, with_metadata, ComputationOutput, Money, OperationType, Percent, PropertyType,
};
use crate::ProFormaResult;

/// Days per month in the room-night revenue formula. A flat 30-day month,
/// not calendar-accurate.
pub const DAYS_PER_MONTH: Decimal = dec!(30);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

fn default_seasonal_multipliers() -> [Decimal; 4] {
    [Decimal::ONE; 4]
}

/// Room-night revenue model for short-term rentals, hotels and arbitrage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueModel {
    pub total_rooms: u32,
    pub average_daily_rate: Money,
    /// Occupancy in percent (0-100)
    pub occupancy_rate: Percent,
    /// Q1..Q4 revenue multipliers
    #[serde(default = "default_seasonal_multipliers")]
    pub seasonal_multipliers: [Decimal; 4],
    #[serde(default)]
    pub fixed_annual_costs: Money,
}

impl RevenueModel {
    /// Validated copy: occupancy clamped, non-positive multipliers reset to 1.
    pub fn sanitized(&self, warnings: &mut Vec<String>) -> ProFormaResult<RevenueModel> {
        if self.total_rooms < 1 {
            return Err(ProFormaError::invalid(
                "total_rooms",
                "A revenue model needs at least one room",
            ));
        }
        if self.average_daily_rate < Decimal::ZERO {
            return Err(ProFormaError::invalid(
                "average_daily_rate",
                "Average daily rate cannot be negative",
            ));
        }
        if self.fixed_annual_costs < Decimal::ZERO {
            return Err(ProFormaError::invalid(
                "fixed_annual_costs",
                "Fixed annual costs cannot be negative",
            ));
        }

        let mut seasonal_multipliers = self.seasonal_multipliers;
        for (q, m) in seasonal_multipliers.iter_mut().enumerate() {
            if *m <= Decimal::ZERO {
                warnings.push(format!(
                    "Q{} seasonal multiplier {} must be positive; using 1.0",
                    q + 1,
                    m
                ));
                *m = Decimal::ONE;
            }
        }

        Ok(RevenueModel {
            total_rooms: self.total_rooms,
            average_daily_rate: self.average_daily_rate,
            occupancy_rate: clamp_percent("occupancy_rate", self.occupancy_rate, warnings),
            seasonal_multipliers,
            fixed_annual_costs: self.fixed_annual_costs,
        })
    }

    /// rooms x ADR x occupancy x 30
    pub fn monthly_revenue(&self) -> Money {
        Decimal::from(self.total_rooms)
            * self.average_daily_rate
            * (self.occupancy_rate / dec!(100))
            * DAYS_PER_MONTH
    }

    /// Revenue per available room-night: ADR x occupancy.
    pub fn rev_par(&self) -> Money {
        self.average_daily_rate * self.occupancy_rate / dec!(100)
    }

    /// Quarterly revenue with seasonality applied (three 30-day months each).
    pub fn quarterly_revenue(&self) -> [Money; 4] {
        let base_quarter = self.monthly_revenue() * dec!(3);
        self.seasonal_multipliers.map(|m| base_quarter * m)
    }
}

/// Where monthly income comes from. Which field is read depends on the
/// operation and property type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncomeSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flat_monthly_income: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue_model: Option<RevenueModel>,
}

impl IncomeSource {
    pub fn flat(monthly_income: Money) -> Self {
        IncomeSource {
            flat_monthly_income: Some(monthly_income),
            revenue_model: None,
        }
    }

    pub fn daily_rate(model: RevenueModel) -> Self {
        IncomeSource {
            flat_monthly_income: None,
            revenue_model: Some(model),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomeInput {
    pub source: IncomeSource,
    #[serde(default)]
    pub operation_type: OperationType,
    #[serde(default)]
    pub property_type: PropertyType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomeOutput {
    pub monthly_income: Money,
    /// monthly_income x 12, no seasonality
    pub annual_income: Money,
    /// True when income came from the room-night formula
    pub daily_rate_basis: bool,
    /// Seasonal view, present for the room-night basis
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quarterly_revenue: Option<[Money; 4]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seasonal_annual_revenue: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rev_par: Option<Money>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Short-term rentals and hotels are priced per room-night.
pub fn uses_daily_rate(operation_type: OperationType, property_type: PropertyType) -> bool {
    operation_type == OperationType::ShortTermRental || property_type == PropertyType::Hotel
}

/// Monthly gross income for the deal.
///
/// Room-night revenue for short-term rentals and hotels, otherwise the
/// caller's flat monthly figure as given.
pub fn compute_monthly_income(
    source: &IncomeSource,
    operation_type: OperationType,
    property_type: PropertyType,
    warnings: &mut Vec<String>,
) -> ProFormaResult<Money> {
    if uses_daily_rate(operation_type, property_type) {
        let model = source.revenue_model.as_ref().ok_or_else(|| {
            ProFormaError::invalid(
                "revenue_model",
                "A revenue model is required for short-term rental and hotel income",
            )
        })?;
        return Ok(model.sanitized(warnings)?.monthly_revenue());
    }

    let income = source.flat_monthly_income.ok_or_else(|| {
        ProFormaError::invalid(
            "flat_monthly_income",
            "A flat monthly income is required for this operation type",
        )
    })?;
    if income < Decimal::ZERO {
        return Err(ProFormaError::invalid(
            "flat_monthly_income",
            "Monthly income cannot be negative",
        ));
    }
    Ok(income)
}

/// Income with its seasonal breakdown.
pub fn analyze_income(input: &IncomeInput) -> ProFormaResult<ComputationOutput<IncomeOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    tracing::debug!(
        operation = ?input.operation_type,
        property = ?input.property_type,
        "computing income"
    );

    let monthly_income = compute_monthly_income(
        &input.source,
        input.operation_type,
        input.property_type,
        &mut warnings,
    )?;
    let daily_rate_basis = uses_daily_rate(input.operation_type, input.property_type);

    let seasonal = if daily_rate_basis {
        // Already validated by compute_monthly_income; warnings not repeated.
        let mut scratch = Vec::new();
        input
            .source
            .revenue_model
            .as_ref()
            .map(|m| m.sanitized(&mut scratch))
            .transpose()?
    } else {
        None
    };

    let quarterly_revenue = seasonal.as_ref().map(|m| m.quarterly_revenue());
    let seasonal_annual_revenue = quarterly_revenue.map(|q| q.iter().copied().sum());
    let rev_par = seasonal.as_ref().map(|m| m.rev_par());

    if daily_rate_basis && input.source.flat_monthly_income.is_some() {
        warnings.push("Flat monthly income ignored: room-night revenue applies".into());
    }

    let output = IncomeOutput {
        monthly_income,
        annual_income: monthly_income * dec!(12),
        daily_rate_basis,
        quarterly_revenue,
        seasonal_annual_revenue,
        rev_par,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Monthly Gross Income (room-night or flat)",
        input,
        warnings,
        elapsed,
        output,
    ))
}
