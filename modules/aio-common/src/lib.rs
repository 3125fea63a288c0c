pub mod config;
pub mod domain;
pub mod error;
pub mod types;

pub use config::{CaptureMode, Config};
pub use domain::{matches, normalize};
pub use error::MonitorError;
pub use types::*;
