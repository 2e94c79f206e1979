pub mod property_age;
pub mod scoring;
