//! CLI output formatting module
//!
//! Provides various output formatters for terminal display.

pub mod progress;
pub mod table;

pub use table::TableFormatter;

/// A command's result, rendered either as a human-readable summary or as
/// JSON for scripting (the `--json` flag).
pub trait CommandOutput {
    /// Human-readable rendering, printed by default.
    fn to_human(&self) -> String;
    /// JSON rendering, printed when `--json` is passed.
    fn to_json(&self) -> serde_json::Value;
}

/// Prints a command's result in the mode the caller asked for.
pub fn output(value: &impl CommandOutput, json_mode: bool) {
    if json_mode {
        println!(
            "{}",
            serde_json::to_string_pretty(&value.to_json()).unwrap_or_default()
        );
    } else {
        println!("{}", value.to_human());
    }
}

/// Truncates `text` to `max_len` bytes, appending `...` if it was cut.
#[must_use]
pub fn truncate(text: &str, max_len: usize) -> String {
    if text.len() <= max_len {
        text.to_string()
    } else {
        format!("{}...", &text[..max_len.saturating_sub(3)])
    }
}
