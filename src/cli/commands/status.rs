//! Status, metrics, and shutdown CLI commands.

use anyhow::Result;

use crate::cli::output::{output, CommandOutput};
use crate::coordinator::Coordinator;
use crate::domain::models::SystemEvent;

#[derive(Debug, serde::Serialize)]
struct StatusOutput {
    swarm_id: String,
    swarm_status: &'static str,
    topology: &'static str,
    agents_by_type: std::collections::HashMap<String, usize>,
    task_counts: std::collections::HashMap<String, u64>,
    memory_entries: u64,
    memory_cached: usize,
    bus_delivered: u64,
    bus_broadcasts: u64,
    healthy: bool,
}

impl CommandOutput for StatusOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("Swarm:    {} ({})", self.swarm_id, self.swarm_status),
            format!("Topology: {}", self.topology),
            format!("Healthy:  {}", self.healthy),
            String::new(),
            "Agents by type:".to_string(),
        ];
        for (agent_type, count) in &self.agents_by_type {
            lines.push(format!("  {agent_type}: {count}"));
        }
        lines.push(String::new());
        lines.push("Tasks by status:".to_string());
        for (status, count) in &self.task_counts {
            lines.push(format!("  {status}: {count}"));
        }
        lines.push(String::new());
        lines.push(format!(
            "Memory: {} entries ({} cached)",
            self.memory_entries, self.memory_cached
        ));
        lines.push(format!(
            "Bus: {} delivered, {} broadcasts",
            self.bus_delivered, self.bus_broadcasts
        ));
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn status(coordinator: &Coordinator, json_mode: bool) -> Result<()> {
    let snapshot = coordinator.status().await?;
    let task_counts = snapshot
        .task_counts
        .into_iter()
        .map(|(status, count)| (status.as_str().to_string(), count))
        .collect();

    let out = StatusOutput {
        swarm_id: snapshot.swarm_id.to_string(),
        swarm_status: snapshot.swarm_status,
        topology: snapshot.topology,
        agents_by_type: snapshot.agents_by_type,
        task_counts,
        memory_entries: snapshot.memory_stats.total_entries,
        memory_cached: snapshot.memory_stats.cached_entries,
        bus_delivered: snapshot.bus_stats.delivered,
        bus_broadcasts: snapshot.bus_stats.broadcasts,
        healthy: snapshot.healthy,
    };
    output(&out, json_mode);
    Ok(())
}

/// Streams the swarm's event feed to stdout until interrupted.
pub async fn metrics(coordinator: &Coordinator) -> Result<()> {
    let mut subscription = coordinator.subscribe();
    println!("Streaming events (ctrl-c to stop)...");
    loop {
        tokio::select! {
            event = subscription.recv() => {
                match event {
                    Ok(envelope) => println!("{}", describe_event(&envelope.event)),
                    Err(_) => continue,
                }
            }
            () = async {
                let _ = tokio::signal::ctrl_c().await;
            } => {
                println!("stopped");
                return Ok(());
            }
        }
    }
}

fn describe_event(event: &SystemEvent) -> String {
    serde_json::to_string(event).unwrap_or_else(|_| "<unserializable event>".to_string())
}

pub async fn shutdown(coordinator: &Coordinator, json_mode: bool) -> Result<()> {
    coordinator.shutdown().await?;
    #[derive(serde::Serialize)]
    struct ShutdownOutput {
        message: String,
    }
    impl CommandOutput for ShutdownOutput {
        fn to_human(&self) -> String {
            self.message.clone()
        }
        fn to_json(&self) -> serde_json::Value {
            serde_json::to_value(self).unwrap_or_default()
        }
    }
    output(
        &ShutdownOutput {
            message: "Swarm terminated.".to_string(),
        },
        json_mode,
    );
    Ok(())
}
