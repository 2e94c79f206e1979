pub mod analysis;
pub mod deal;
pub mod debt;
pub mod operating;
pub mod refinance;
pub mod returns;
pub mod risk;
pub mod tax;
