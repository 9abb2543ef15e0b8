pub mod classifier;
pub mod combiner;
