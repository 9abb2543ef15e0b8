pub mod dispatcher;
pub mod relay;
