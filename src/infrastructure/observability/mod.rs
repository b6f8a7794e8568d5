//! Observability setup

mod logging_setup;

pub use logging_setup::init_logging;
