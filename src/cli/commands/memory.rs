//! Collective memory CLI commands.

use anyhow::{anyhow, Result};

use crate::cli::output::{output, table::TableFormatter, CommandOutput};
use crate::cli::types::MemoryCommands;
use crate::coordinator::Coordinator;

#[derive(Debug, serde::Serialize)]
struct MemoryActionOutput {
    message: String,
    value: Option<serde_json::Value>,
}

impl CommandOutput for MemoryActionOutput {
    fn to_human(&self) -> String {
        match &self.value {
            Some(value) => format!("{}\n{}", self.message, value),
            None => self.message.clone(),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
struct MemoryListOutput {
    entries: Vec<serde_json::Value>,
    human: String,
}

impl CommandOutput for MemoryListOutput {
    fn to_human(&self) -> String {
        self.human.clone()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "entries": self.entries })
    }
}

pub async fn execute(coordinator: &Coordinator, command: MemoryCommands, json_mode: bool) -> Result<()> {
    match command {
        MemoryCommands::Store { namespace, key, value } => {
            let value: serde_json::Value = serde_json::from_str(&value)
                .map_err(|_| anyhow!("value must be valid JSON"))?;
            coordinator.memory_store(&namespace, &key, value).await?;
            output(
                &MemoryActionOutput {
                    message: format!("Stored {namespace}/{key}"),
                    value: None,
                },
                json_mode,
            );
        }

        MemoryCommands::Get { namespace, key } => {
            let value = coordinator.memory_get(&namespace, &key).await?;
            let message = if value.is_some() {
                format!("{namespace}/{key}")
            } else {
                format!("{namespace}/{key} not found")
            };
            output(&MemoryActionOutput { message, value }, json_mode);
        }

        MemoryCommands::Delete { namespace, key } => {
            coordinator.memory_delete(&namespace, &key).await?;
            output(
                &MemoryActionOutput {
                    message: format!("Deleted {namespace}/{key}"),
                    value: None,
                },
                json_mode,
            );
        }

        MemoryCommands::List { namespace, limit } => {
            let entries = coordinator.memory_list(&namespace, limit).await?;
            let human = TableFormatter::new().format_memory(&entries);
            output(
                &MemoryListOutput {
                    entries: entries
                        .iter()
                        .map(|e| serde_json::to_value(e).unwrap_or_default())
                        .collect(),
                    human,
                },
                json_mode,
            );
        }
    }

    Ok(())
}
