//! Logging and notification sinks.

mod logging;
mod notify;

pub use logging::setup_logging;
pub use notify::{LogNotifier, TwilioConfig, TwilioNotifier};
