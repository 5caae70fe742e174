//! Implementation of the `hivemind spawn` command.

use anyhow::Result;

use crate::cli::output::{output, CommandOutput};
use crate::cli::types::{QueenModeArg, TopologyArg};
use crate::coordinator::{Coordinator, ObjectiveOptions};
use crate::domain::models::{QueenMode, Topology};

#[derive(Debug, serde::Serialize)]
pub struct SpawnOutput {
    pub swarm_id: String,
}

impl CommandOutput for SpawnOutput {
    fn to_human(&self) -> String {
        format!("Swarm {} is active.", self.swarm_id)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(
    coordinator: &Coordinator,
    objective: String,
    queen_type: Option<QueenModeArg>,
    max_workers: Option<usize>,
    topology: Option<TopologyArg>,
    json_mode: bool,
) -> Result<()> {
    let options = ObjectiveOptions {
        topology: topology.map(|t| match t {
            TopologyArg::Hierarchical => Topology::Hierarchical,
            TopologyArg::Mesh => Topology::Mesh,
            TopologyArg::Ring => Topology::Ring,
            TopologyArg::Star => Topology::Star,
        }),
        queen_mode: queen_type.map(|q| match q {
            QueenModeArg::Centralized => QueenMode::Centralized,
            QueenModeArg::Distributed => QueenMode::Distributed,
            QueenModeArg::Strategic => QueenMode::Strategic,
        }),
        max_workers,
    };

    let swarm_id = coordinator.submit_objective(objective, options).await?;

    let out = SpawnOutput {
        swarm_id: swarm_id.to_string(),
    };
    output(&out, json_mode);
    Ok(())
}
