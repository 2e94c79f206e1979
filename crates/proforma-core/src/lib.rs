pub mod deal;
pub mod debt;
pub mod error;
pub mod market;
pub mod operating;
pub mod settings;
pub mod time_value;
pub mod types;

#[cfg(feature = "returns")]
pub mod returns;

#[cfg(feature = "analysis")]
pub mod analysis;

#[cfg(feature = "risk")]
pub mod risk;

#[cfg(feature = "refinance")]
pub mod refinance;

#[cfg(feature = "tax")]
pub mod tax;

pub use error::ProFormaError;
pub use settings::AnalysisSettings;
pub use types::*;

/// Standard result type for all pro forma operations
pub type ProFormaResult<T> = Result<T, ProFormaError>;
