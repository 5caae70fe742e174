//! Table output formatting for CLI commands
//!
//! Provides formatted table output for tasks, agents, proposals, and
//! memory entries using comfy-table. Supports color-coded cells,
//! automatic column sizing, and accessibility features.

use crate::domain::models::{
    Agent, AgentStatus, MemoryEntry, Proposal, ProposalStatus, Task, TaskStatus,
};
use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use std::env;

/// Table formatter for CLI output
pub struct TableFormatter {
    /// Whether to use colors in output
    use_colors: bool,
    /// Maximum width for tables (None = auto)
    max_width: Option<usize>,
}

impl TableFormatter {
    /// Create a new table formatter
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
            max_width: None,
        }
    }

    /// Create a new table formatter with custom settings
    pub fn with_config(use_colors: bool, max_width: Option<usize>) -> Self {
        Self {
            use_colors,
            max_width,
        }
    }

    /// Format a list of tasks as a table
    pub fn format_tasks(&self, tasks: &[Task]) -> String {
        let mut table = self.create_base_table();

        table.set_header(vec![
            Cell::new("ID").add_attribute(Attribute::Bold),
            Cell::new("Description").add_attribute(Attribute::Bold),
            Cell::new("Priority").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
            Cell::new("Agents").add_attribute(Attribute::Bold),
            Cell::new("Progress").add_attribute(Attribute::Bold),
        ]);

        for task in tasks {
            let id_short = &task.id.to_string()[..8];
            let description = truncate_text(&task.description, 40);

            let status_cell = if self.use_colors {
                Cell::new(task.status.as_str()).fg(status_color(task.status))
            } else {
                Cell::new(format!("{} {}", status_icon(task.status), task.status.as_str()))
            };

            let agents = format!("{}/{}", task.assigned_agents.len(), task.max_agents);
            let progress = format!("{:.0}%", task.progress * 100.0);

            table.add_row(vec![
                Cell::new(id_short),
                Cell::new(&description),
                Cell::new(task.priority.as_str()),
                status_cell,
                Cell::new(&agents),
                Cell::new(&progress),
            ]);
        }

        table.to_string()
    }

    /// Format a list of agents as a table
    pub fn format_agents(&self, agents: &[Agent]) -> String {
        let mut table = self.create_base_table();

        table.set_header(vec![
            Cell::new("ID").add_attribute(Attribute::Bold),
            Cell::new("Type").add_attribute(Attribute::Bold),
            Cell::new("Role").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
            Cell::new("Current Task").add_attribute(Attribute::Bold),
            Cell::new("Completed").add_attribute(Attribute::Bold),
        ]);

        for agent in agents {
            let id_short = &agent.id.to_string()[..8];

            let status_cell = if self.use_colors {
                Cell::new(agent.status.as_str()).fg(agent_status_color(agent.status))
            } else {
                Cell::new(format!("{} {}", agent_status_icon(agent.status), agent.status.as_str()))
            };

            let task_id = agent
                .current_task_id
                .map(|id| id.to_string()[..8].to_string())
                .unwrap_or_else(|| "-".to_string());

            table.add_row(vec![
                Cell::new(id_short),
                Cell::new(&agent.agent_type),
                Cell::new(agent.role.as_str()),
                status_cell,
                Cell::new(&task_id),
                Cell::new(agent.tasks_completed.to_string()),
            ]);
        }

        table.to_string()
    }

    /// Format a list of consensus proposals as a table
    pub fn format_proposals(&self, proposals: &[Proposal]) -> String {
        let mut table = self.create_base_table();

        table.set_header(vec![
            Cell::new("ID").add_attribute(Attribute::Bold),
            Cell::new("Description").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
            Cell::new("Votes").add_attribute(Attribute::Bold),
            Cell::new("Winner").add_attribute(Attribute::Bold),
        ]);

        for proposal in proposals {
            let id_short = &proposal.id.0.to_string()[..8];
            let description = truncate_text(&proposal.description, 40);

            let status_cell = if self.use_colors {
                Cell::new(proposal.status.as_str()).fg(proposal_status_color(proposal.status))
            } else {
                Cell::new(proposal.status.as_str())
            };

            let votes = format!(
                "{}/{}",
                proposal.votes.len(),
                proposal.eligible_voters.len()
            );
            let winner = proposal
                .result
                .as_ref()
                .and_then(|r| r.winning_option.clone())
                .unwrap_or_else(|| "-".to_string());

            table.add_row(vec![
                Cell::new(id_short),
                Cell::new(&description),
                status_cell,
                Cell::new(&votes),
                Cell::new(&winner),
            ]);
        }

        table.to_string()
    }

    /// Format a list of memory entries as a table
    pub fn format_memory(&self, entries: &[MemoryEntry]) -> String {
        let mut table = self.create_base_table();

        table.set_header(vec![
            Cell::new("Namespace").add_attribute(Attribute::Bold),
            Cell::new("Key").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
            Cell::new("Accesses").add_attribute(Attribute::Bold),
            Cell::new("Created").add_attribute(Attribute::Bold),
        ]);

        for entry in entries {
            let value = truncate_text(&entry.value.to_string(), 40);

            table.add_row(vec![
                Cell::new(truncate_text(&entry.namespace, 30)),
                Cell::new(truncate_text(&entry.key, 20)),
                Cell::new(&value),
                Cell::new(entry.access_count.to_string()),
                Cell::new(format_relative_time(&entry.created_at)),
            ]);
        }

        table.to_string()
    }

    /// Create a base table with common settings
    fn create_base_table(&self) -> Table {
        let mut table = Table::new();

        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        if let Some(width) = self.max_width {
            table.set_width(width as u16);
        }

        table
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// Check if color output is supported
fn supports_color() -> bool {
    if env::var("NO_COLOR").is_ok() {
        return false;
    }

    if let Ok(term) = env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    true
}

/// Map task status to color
fn status_color(status: TaskStatus) -> Color {
    match status {
        TaskStatus::Completed => Color::Green,
        TaskStatus::InProgress => Color::Cyan,
        TaskStatus::Assigned => Color::Yellow,
        TaskStatus::Failed => Color::Red,
        TaskStatus::Cancelled => Color::DarkGrey,
        TaskStatus::Pending => Color::White,
    }
}

/// Map task status to icon
fn status_icon(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Completed => "✓",
        TaskStatus::InProgress => "⟳",
        TaskStatus::Assigned => "⧗",
        TaskStatus::Failed => "✗",
        TaskStatus::Cancelled => "⊘",
        TaskStatus::Pending => "○",
    }
}

/// Map agent status to color
fn agent_status_color(status: AgentStatus) -> Color {
    match status {
        AgentStatus::Idle => Color::Green,
        AgentStatus::Busy => Color::Yellow,
        AgentStatus::Active => Color::Cyan,
        AgentStatus::Error => Color::Red,
        AgentStatus::Offline => Color::DarkGrey,
    }
}

/// Map agent status to icon
fn agent_status_icon(status: AgentStatus) -> &'static str {
    match status {
        AgentStatus::Idle => "○",
        AgentStatus::Busy => "◐",
        AgentStatus::Active => "●",
        AgentStatus::Error => "✗",
        AgentStatus::Offline => "⊘",
    }
}

/// Map proposal status to color
fn proposal_status_color(status: ProposalStatus) -> Color {
    match status {
        ProposalStatus::Open => Color::Yellow,
        ProposalStatus::Decided => Color::Green,
        ProposalStatus::TimedOut => Color::Red,
    }
}

/// Truncate text to max length with ellipsis
fn truncate_text(text: &str, max_len: usize) -> String {
    if text.len() <= max_len {
        text.to_string()
    } else {
        format!("{}...", &text[..max_len.saturating_sub(3)])
    }
}

/// Format relative time (e.g., "2 hours ago")
fn format_relative_time(datetime: &chrono::DateTime<chrono::Utc>) -> String {
    let now = chrono::Utc::now();
    let duration = now.signed_duration_since(*datetime);

    if duration.num_seconds() < 60 {
        "just now".to_string()
    } else if duration.num_minutes() < 60 {
        let mins = duration.num_minutes();
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if duration.num_hours() < 24 {
        let hours = duration.num_hours();
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if duration.num_days() < 30 {
        let days = duration.num_days();
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        datetime.format("%Y-%m-%d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{
        AgentRole, ConsensusAlgorithm, RetentionPolicy, SwarmId,
    };
    use chrono::Utc;

    #[test]
    fn test_table_formatter_with_config() {
        let formatter = TableFormatter::with_config(false, Some(120));
        assert!(!formatter.use_colors);
        assert_eq!(formatter.max_width, Some(120));
    }

    #[test]
    fn test_format_tasks() {
        let task = Task::new(SwarmId::new(), "Research the thing");
        let formatter = TableFormatter::with_config(false, None);
        let output = formatter.format_tasks(&[task]);

        assert!(output.contains("Research the thing"));
        assert!(output.contains("pending"));
    }

    #[test]
    fn test_format_agents() {
        let agent = Agent::new(SwarmId::new(), AgentRole::Worker, "coder", []);
        let formatter = TableFormatter::with_config(false, None);
        let output = formatter.format_agents(&[agent]);

        assert!(output.contains("coder"));
        assert!(output.contains("idle"));
    }

    #[test]
    fn test_format_proposals() {
        let proposal = Proposal::new(
            SwarmId::new(),
            "Pick an approach",
            vec!["a".to_string(), "b".to_string()],
            ConsensusAlgorithm::Majority,
            vec![],
            Utc::now(),
        );
        let formatter = TableFormatter::with_config(false, None);
        let output = formatter.format_proposals(&[proposal]);

        assert!(output.contains("Pick an approach"));
        assert!(output.contains("open"));
    }

    #[test]
    fn test_format_memory() {
        let entry = MemoryEntry::new(
            "notes",
            "key1",
            serde_json::json!({"a": 1}),
            RetentionPolicy::Persistent,
        );
        let formatter = TableFormatter::with_config(false, None);
        let output = formatter.format_memory(&[entry]);

        assert!(output.contains("notes"));
        assert!(output.contains("key1"));
    }

    #[test]
    fn test_status_icon_mapping() {
        assert_eq!(status_icon(TaskStatus::Completed), "✓");
        assert_eq!(status_icon(TaskStatus::Failed), "✗");
        assert_eq!(status_icon(TaskStatus::Pending), "○");
    }

    #[test]
    fn test_status_color_mapping() {
        assert_eq!(status_color(TaskStatus::Completed), Color::Green);
        assert_eq!(status_color(TaskStatus::Failed), Color::Red);
    }

    #[test]
    fn test_agent_status_icon_mapping() {
        assert_eq!(agent_status_icon(AgentStatus::Idle), "○");
        assert_eq!(agent_status_icon(AgentStatus::Offline), "⊘");
    }

    #[test]
    fn test_agent_status_color_mapping() {
        assert_eq!(agent_status_color(AgentStatus::Idle), Color::Green);
        assert_eq!(agent_status_color(AgentStatus::Offline), Color::DarkGrey);
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("this is a very long text", 10), "this is...");
        assert_eq!(truncate_text("exactly10!", 10), "exactly10!");
    }

    #[test]
    fn test_truncate_text_edge_cases() {
        assert_eq!(truncate_text("", 10), "");
        assert_eq!(truncate_text("abc", 3), "abc");
        assert_eq!(truncate_text("abcd", 3), "...");
    }
}
