pub mod analysis;
pub mod bot;
pub mod dispatch;
pub mod market_data;
pub mod signals;
