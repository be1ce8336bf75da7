//! Process-wide logging setup shared by binaries and test harnesses.

/// Initialize structured logging.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    tracing::init(tracing::LogFormat::from_env());
}

/// Subscriber construction (filter, output format).
pub mod tracing;
