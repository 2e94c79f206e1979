pub mod expenses;
pub mod income;
