//! Domain layer for the Hive-Mind Coordinator.
//!
//! This module contains core business logic and domain models, free of any
//! infrastructure concerns (no `sqlx`, no `tokio`, no `clap`).

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{CoordinatorError, CoordinatorResult};
