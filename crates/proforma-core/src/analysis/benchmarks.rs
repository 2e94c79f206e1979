use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::types::{
    percent_of, with_metadata, ComputationOutput, OperatingAssumptions, Percent, PropertyType,
};
use crate::ProFormaResult;

/// Relative band around a benchmark still reported as `Within`.
pub const BENCHMARK_TOLERANCE_PERCENT: Decimal = dec!(10);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Typical operating percentages for a property class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkTable {
    pub maintenance: Percent,
    pub vacancy: Percent,
    pub management: Percent,
    pub cap_ex: Percent,
    pub op_ex: Percent,
}

impl Default for BenchmarkTable {
    fn default() -> Self {
        BenchmarkTable::residential()
    }
}

impl BenchmarkTable {
    pub fn residential() -> Self {
        BenchmarkTable {
            maintenance: dec!(5),
            vacancy: dec!(5),
            management: dec!(8),
            cap_ex: dec!(5),
            op_ex: dec!(10),
        }
    }

    pub fn commercial() -> Self {
        BenchmarkTable {
            maintenance: dec!(4),
            vacancy: dec!(8),
            management: dec!(5),
            cap_ex: dec!(4),
            op_ex: dec!(15),
        }
    }

    /// Hotels and short stays carry heavier management and turnover costs.
    pub fn hospitality() -> Self {
        BenchmarkTable {
            maintenance: dec!(6),
            vacancy: dec!(30),
            management: dec!(20),
            cap_ex: dec!(5),
            op_ex: dec!(25),
        }
    }

    pub fn for_property(property_type: PropertyType) -> Self {
        match property_type {
            PropertyType::Hotel => BenchmarkTable::hospitality(),
            PropertyType::Office | PropertyType::Retail => BenchmarkTable::commercial(),
            PropertyType::SingleFamily | PropertyType::MultiFamily | PropertyType::Land => {
                BenchmarkTable::residential()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BenchmarkStatus {
    Below,
    Within,
    Above,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkComparison {
    pub category: String,
    pub current: Percent,
    pub benchmark: Percent,
    /// current - benchmark, percentage points
    pub variance: Percent,
    /// variance / benchmark x 100; `None` for a zero benchmark
    pub variance_percent: Option<Percent>,
    pub status: BenchmarkStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkInput {
    pub operating: OperatingAssumptions,
    /// Selects the class table when no explicit table is given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_type: Option<PropertyType>,
    /// Explicit table; takes precedence over `property_type`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benchmarks: Option<BenchmarkTable>,
}

impl BenchmarkInput {
    /// The table compared against: explicit, then by property class, then residential.
    pub fn table(&self) -> BenchmarkTable {
        match (&self.benchmarks, self.property_type) {
            (Some(table), _) => table.clone(),
            (None, Some(property_type)) => BenchmarkTable::for_property(property_type),
            (None, None) => BenchmarkTable::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkOutput {
    pub comparisons: Vec<BenchmarkComparison>,
    pub categories_above: u32,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Compare each operating percentage with its benchmark.
pub fn compare_to_benchmarks(
    input: &BenchmarkInput,
) -> ProFormaResult<ComputationOutput<BenchmarkOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    tracing::debug!("comparing operating assumptions to benchmarks");

    let ops = input.operating.clamped(&mut warnings);
    let table = input.table();

    let comparisons: Vec<BenchmarkComparison> = [
        ("maintenance", ops.maintenance, table.maintenance),
        ("vacancy", ops.vacancy, table.vacancy),
        ("management", ops.management, table.management),
        ("cap_ex", ops.cap_ex, table.cap_ex),
        ("op_ex", ops.op_ex, table.op_ex),
    ]
    .into_iter()
    .map(|(category, current, benchmark)| compare(category, current, benchmark))
    .collect();

    let categories_above = comparisons
        .iter()
        .filter(|c| c.status == BenchmarkStatus::Above)
        .count() as u32;

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Operating Benchmark Comparison (+/-10% tolerance band)",
        input,
        warnings,
        elapsed,
        BenchmarkOutput {
            comparisons,
            categories_above,
        },
    ))
}

fn compare(category: &str, current: Percent, benchmark: Percent) -> BenchmarkComparison {
    let variance = current - benchmark;
    let band = benchmark.abs() * BENCHMARK_TOLERANCE_PERCENT / dec!(100);
    let status = if variance > band {
        BenchmarkStatus::Above
    } else if variance < -band {
        BenchmarkStatus::Below
    } else {
        BenchmarkStatus::Within
    };

    BenchmarkComparison {
        category: category.to_string(),
        current,
        benchmark,
        variance,
        variance_percent: percent_of(variance, benchmark),
        status,
    }
}
