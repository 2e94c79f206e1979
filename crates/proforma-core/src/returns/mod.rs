pub mod metrics;
pub mod projection;
