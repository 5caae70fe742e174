//! CLI interface module
//!
//! This module contains all command-line interface components including:
//! - Command definitions and handlers (§6)
//! - Terminal output formatting (tables, progress bars)

pub mod commands;
pub mod output;
pub mod types;

pub use types::{Cli, Commands};
