//! Task CLI commands.

use anyhow::{anyhow, Result};

use crate::cli::output::{output, table::TableFormatter, CommandOutput};
use crate::cli::types::{TaskCommands, TaskPriorityArg};
use crate::coordinator::{Coordinator, TaskSpec};
use crate::domain::models::{Capability, TaskId, TaskPriority, TaskStatus};

#[derive(Debug, serde::Serialize)]
struct TaskActionOutput {
    message: String,
}

impl CommandOutput for TaskActionOutput {
    fn to_human(&self) -> String {
        self.message.clone()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
struct TaskListOutput {
    tasks: Vec<serde_json::Value>,
    human: String,
}

impl CommandOutput for TaskListOutput {
    fn to_human(&self) -> String {
        self.human.clone()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "tasks": self.tasks })
    }
}

pub async fn execute(coordinator: &Coordinator, command: TaskCommands, json_mode: bool) -> Result<()> {
    match command {
        TaskCommands::Submit {
            description,
            priority,
            capabilities,
            dependencies,
            max_agents,
            require_consensus,
        } => {
            let priority = match priority {
                TaskPriorityArg::Low => TaskPriority::Low,
                TaskPriorityArg::Normal => TaskPriority::Normal,
                TaskPriorityArg::High => TaskPriority::High,
                TaskPriorityArg::Critical => TaskPriority::Critical,
            };

            let mut spec = TaskSpec::new(description)
                .with_priority(priority)
                .with_max_agents(max_agents)
                .with_require_consensus(require_consensus);
            for capability in capabilities {
                spec = spec.with_required_capability(Capability::new(capability));
            }
            for dependency in dependencies {
                spec = spec.with_dependency(TaskId(dependency));
            }

            let task_id = coordinator.submit_task(spec).await?;
            output(
                &TaskActionOutput {
                    message: format!("Task submitted: {task_id}"),
                },
                json_mode,
            );
        }

        TaskCommands::List { status } => {
            let status = match status {
                Some(s) => Some(
                    TaskStatus::parse_str(&s).ok_or_else(|| anyhow!("unknown task status: {s}"))?,
                ),
                None => None,
            };
            let tasks = coordinator.list_tasks(status).await?;
            let human = TableFormatter::new().format_tasks(&tasks);
            output(
                &TaskListOutput {
                    tasks: tasks.iter().map(|t| serde_json::to_value(t).unwrap_or_default()).collect(),
                    human,
                },
                json_mode,
            );
        }

        TaskCommands::Show { task_id } => {
            let task = coordinator
                .get_task(TaskId(task_id))
                .await?
                .ok_or_else(|| anyhow!("task not found: {task_id}"))?;
            let human = TableFormatter::new().format_tasks(std::slice::from_ref(&task));
            output(
                &TaskListOutput {
                    tasks: vec![serde_json::to_value(&task).unwrap_or_default()],
                    human,
                },
                json_mode,
            );
        }

        TaskCommands::Cancel { task_id } => {
            coordinator.cancel_task(TaskId(task_id)).await?;
            output(
                &TaskActionOutput {
                    message: format!("Task cancelled: {task_id}"),
                },
                json_mode,
            );
        }
    }

    Ok(())
}
