pub mod audio;
pub mod config;
pub mod logging;
pub mod posture;
mod telemetry;
#[cfg(feature = "vad_earshot")]
pub mod vad_earshot;

pub use logging::{init_logging, log_debug};

/// One-call setup for the binary: debug log file plus the tracing subscriber.
pub fn init_observability(config: &config::AppConfig) {
    logging::init_logging(config);
    telemetry::init_tracing(config);
}
