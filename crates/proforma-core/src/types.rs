use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ProFormaError;
use crate::ProFormaResult;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Percentages as the UI enters them (5 = 5%). Never as decimals.
pub type Percent = Decimal;

/// Periodic rates expressed as decimals (0.05 = 5%), used by the solvers.
pub type Rate = Decimal;

/// Multiples (e.g., 1.35x DSCR, 12x GRM)
pub type Multiple = Decimal;

/// Year fractions or counts
pub type Years = Decimal;

// ---------------------------------------------------------------------------
// Deal classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyType {
    #[default]
    SingleFamily,
    MultiFamily,
    Hotel,
    Land,
    Office,
    Retail,
}

impl PropertyType {
    /// Residential rental property under the 27.5-year recovery schedule.
    pub fn is_residential(self) -> bool {
        matches!(self, PropertyType::SingleFamily | PropertyType::MultiFamily)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationType {
    #[default]
    BuyAndHold,
    FixAndFlip,
    ShortTermRental,
    RentalArbitrage,
    #[serde(rename = "BRRRR")]
    Brrrr,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FinanceType {
    #[default]
    Conventional,
    Fha,
    Va,
    HardMoney,
    PrivateMoney,
    SellerFinancing,
    Dscr,
    Cash,
}

// ---------------------------------------------------------------------------
// Deal inputs
// ---------------------------------------------------------------------------

/// Longest holding period the projection and IRR solver accept.
pub const MAX_HOLDING_PERIOD_YEARS: u32 = 30;

fn default_units() -> u32 {
    1
}

fn default_holding_period() -> u32 {
    5
}

fn default_appreciation() -> Percent {
    dec!(3)
}

fn default_growth() -> Percent {
    dec!(2)
}

/// Structural inputs of a deal as collected by the Analyze workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealInputs {
    pub purchase_price: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listed_price: Option<Money>,
    pub down_payment: Money,
    #[serde(default)]
    pub closing_costs: Money,
    #[serde(default)]
    pub rehab_costs: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub square_footage: Option<Decimal>,
    #[serde(default = "default_units")]
    pub units: u32,
    #[serde(default)]
    pub property_type: PropertyType,
    #[serde(default)]
    pub operation_type: OperationType,
    #[serde(default)]
    pub finance_type: FinanceType,
    /// Holding period used for multi-year metrics (IRR, equity multiple)
    #[serde(default = "default_holding_period")]
    pub holding_period_years: u32,
    #[serde(default = "default_appreciation")]
    pub annual_appreciation_percent: Percent,
    #[serde(default = "default_growth")]
    pub annual_rent_growth_percent: Percent,
    #[serde(default = "default_growth")]
    pub annual_expense_growth_percent: Percent,
    /// Cash set aside for operating shortfalls
    #[serde(default)]
    pub cash_reserves: Money,
}

impl DealInputs {
    /// Reject values that have no sane clamp.
    pub fn validate(&self) -> ProFormaResult<()> {
        if self.purchase_price < Decimal::ZERO {
            return Err(ProFormaError::invalid(
                "purchase_price",
                "Purchase price cannot be negative",
            ));
        }
        if self.down_payment < Decimal::ZERO {
            return Err(ProFormaError::invalid(
                "down_payment",
                "Down payment cannot be negative",
            ));
        }
        if self.down_payment > self.purchase_price {
            return Err(ProFormaError::invalid(
                "down_payment",
                "Down payment cannot exceed the purchase price",
            ));
        }
        if self.closing_costs < Decimal::ZERO || self.rehab_costs < Decimal::ZERO {
            return Err(ProFormaError::invalid(
                "closing_costs",
                "Closing and rehab costs cannot be negative",
            ));
        }
        if self.units < 1 {
            return Err(ProFormaError::invalid("units", "A deal has at least one unit"));
        }
        if !(1..=MAX_HOLDING_PERIOD_YEARS).contains(&self.holding_period_years) {
            return Err(ProFormaError::invalid(
                "holding_period_years",
                format!("Holding period must be between 1 and {MAX_HOLDING_PERIOD_YEARS} years"),
            ));
        }
        Ok(())
    }

    /// Financed amount: purchase price less down payment, floored at zero.
    pub fn loan_amount(&self) -> Money {
        (self.purchase_price - self.down_payment).max(Decimal::ZERO)
    }

    /// Equity brought to closing: down payment, closing costs and rehab.
    pub fn total_cash_invested(&self) -> Money {
        self.down_payment + self.closing_costs + self.rehab_costs
    }
}

/// Financing terms. The principal is always derived from the deal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanTerms {
    /// Annual interest rate in percent (6.5 = 6.5%)
    pub annual_interest_rate: Percent,
    /// Quoted payment; derived by amortization when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_payment: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amortization_years: Option<u32>,
}

/// Five operating percentages, each a percent of monthly income.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperatingAssumptions {
    pub maintenance: Percent,
    pub vacancy: Percent,
    pub management: Percent,
    pub cap_ex: Percent,
    pub op_ex: Percent,
    /// Taxes, insurance, utilities and other fixed monthly costs
    #[serde(default)]
    pub fixed_monthly_costs: Money,
}

impl OperatingAssumptions {
    /// Sum of the five percentages. Deliberately not capped at 100.
    pub fn total_variable_percent(&self) -> Percent {
        self.maintenance + self.vacancy + self.management + self.cap_ex + self.op_ex
    }

    /// Copy with every percentage clamped into [0, 100].
    pub fn clamped(&self, warnings: &mut Vec<String>) -> OperatingAssumptions {
        OperatingAssumptions {
            maintenance: clamp_percent("maintenance", self.maintenance, warnings),
            vacancy: clamp_percent("vacancy", self.vacancy, warnings),
            management: clamp_percent("management", self.management, warnings),
            cap_ex: clamp_percent("cap_ex", self.cap_ex, warnings),
            op_ex: clamp_percent("op_ex", self.op_ex, warnings),
            fixed_monthly_costs: self.fixed_monthly_costs,
        }
    }

    /// Scale all five percentages by the same factor.
    pub fn scaled(&self, factor: Decimal) -> OperatingAssumptions {
        OperatingAssumptions {
            maintenance: self.maintenance * factor,
            vacancy: self.vacancy * factor,
            management: self.management * factor,
            cap_ex: self.cap_ex * factor,
            op_ex: self.op_ex * factor,
            fixed_monthly_costs: self.fixed_monthly_costs,
        }
    }
}

// ---------------------------------------------------------------------------
// Output envelope
// ---------------------------------------------------------------------------

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `numerator / denominator`, or `None` when the denominator is zero.
pub fn ratio(numerator: Decimal, denominator: Decimal) -> Option<Decimal> {
    if denominator.is_zero() {
        None
    } else {
        Some(numerator / denominator)
    }
}

/// `numerator / denominator * 100`, or `None` when the denominator is zero.
pub fn percent_of(numerator: Decimal, denominator: Decimal) -> Option<Percent> {
    ratio(numerator, denominator).map(|r| r * dec!(100))
}

/// Clamp a percentage into [0, 100], recording a warning when it moves.
pub fn clamp_percent(field: &str, value: Percent, warnings: &mut Vec<String>) -> Percent {
    let clamped = value.clamp(Decimal::ZERO, dec!(100));
    if clamped != value {
        tracing::warn!(field, %value, %clamped, "percentage clamped");
        warnings.push(format!(
            "{field} of {value}% is outside 0-100 and was clamped to {clamped}%"
        ));
    }
    clamped
}
