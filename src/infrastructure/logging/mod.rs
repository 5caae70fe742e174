//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - JSON or pretty log formatting (§6.2)
//! - Daily/hourly file rotation via tracing-appender
//! - Secret scrubbing for API keys, tokens, and passwords
//! - `--verbose` CLI override layered on top of `logging.level`

mod config;
mod logger;
mod secret_scrubbing;

pub use config::{LogConfig, LogFormat, RotationPolicy};
pub use logger::LoggerImpl;
pub use secret_scrubbing::SecretScrubbingLayer;
