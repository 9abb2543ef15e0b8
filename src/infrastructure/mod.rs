pub mod binance;
pub mod console;
pub mod core;
pub mod logging;
pub mod mock;

pub use console::ConsoleSink;
pub use mock::{MockCandleProvider, MockMetricsProvider, RecordingSink};
