pub mod indicator_engine;
pub mod volatility;
pub mod volume_profile;
