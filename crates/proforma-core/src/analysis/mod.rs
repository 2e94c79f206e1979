pub mod benchmarks;
pub mod break_even;
pub mod sensitivity;
