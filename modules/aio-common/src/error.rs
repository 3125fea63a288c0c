use thiserror::Error;

/// Errors fatal to a whole run. Per-keyword failures are recorded on the
/// result instead.
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Configuration error: {0}")]
    Config(String),
}
