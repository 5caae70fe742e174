//! Infrastructure layer
//!
//! Process-level concerns that sit outside the hexagon: configuration
//! loading and structured logging. Durable storage lives under
//! [`crate::adapters::sqlite`] since it implements domain repository
//! ports rather than being a bare external dependency.

pub mod config;
pub mod logging;
