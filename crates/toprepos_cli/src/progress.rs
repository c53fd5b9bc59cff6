//! Surfacing sync progress events.

mod logging;

pub use logging::LoggingReporter;
