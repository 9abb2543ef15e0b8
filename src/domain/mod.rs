pub mod analysis;
pub mod bot_kind;
pub mod dispatch;
pub mod errors;
pub mod market;
pub mod ports;
pub mod signal;
