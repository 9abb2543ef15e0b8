pub mod orchestrator;
pub mod price_bands;
pub mod sections;
pub mod summary;
