//! Consensus CLI commands.

use anyhow::{anyhow, Result};

use crate::cli::output::{output, table::TableFormatter, CommandOutput};
use crate::cli::types::{ConsensusAlgorithmArg, ConsensusCommands};
use crate::coordinator::{Coordinator, ProposalSpec};
use crate::domain::models::{AgentId, ConsensusAlgorithm, ProposalId, ProposalStatus};

#[derive(Debug, serde::Serialize)]
struct ProposalActionOutput {
    message: String,
}

impl CommandOutput for ProposalActionOutput {
    fn to_human(&self) -> String {
        self.message.clone()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
struct ProposalListOutput {
    proposals: Vec<serde_json::Value>,
    human: String,
}

impl CommandOutput for ProposalListOutput {
    fn to_human(&self) -> String {
        self.human.clone()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "proposals": self.proposals })
    }
}

pub async fn execute(coordinator: &Coordinator, command: ConsensusCommands, json_mode: bool) -> Result<()> {
    match command {
        ConsensusCommands::Propose { description, options, algorithm, deadline_secs } => {
            if options.is_empty() {
                return Err(anyhow!("at least one option is required"));
            }
            let algorithm = match algorithm {
                ConsensusAlgorithmArg::Majority => ConsensusAlgorithm::Majority,
                ConsensusAlgorithmArg::Weighted => ConsensusAlgorithm::Weighted,
                ConsensusAlgorithmArg::Byzantine => ConsensusAlgorithm::Byzantine,
            };
            let mut spec = ProposalSpec::new(description, options).with_algorithm(algorithm);
            if let Some(deadline_secs) = deadline_secs {
                spec = spec.with_deadline_secs(deadline_secs);
            }
            let proposal_id = coordinator.propose(spec).await?;
            output(
                &ProposalActionOutput {
                    message: format!("Proposal opened: {}", proposal_id.0),
                },
                json_mode,
            );
        }

        ConsensusCommands::Vote { proposal_id, voter, choice } => {
            coordinator
                .vote(ProposalId(proposal_id), AgentId(voter), choice)
                .await?;
            output(
                &ProposalActionOutput {
                    message: format!("Vote cast on proposal {proposal_id}"),
                },
                json_mode,
            );
        }

        ConsensusCommands::Show { proposal_id } => {
            let proposal = coordinator
                .get_proposal(ProposalId(proposal_id))
                .await?
                .ok_or_else(|| anyhow!("proposal not found: {proposal_id}"))?;
            let human = TableFormatter::new().format_proposals(std::slice::from_ref(&proposal));
            output(
                &ProposalListOutput {
                    proposals: vec![serde_json::to_value(&proposal).unwrap_or_default()],
                    human,
                },
                json_mode,
            );
        }

        ConsensusCommands::List { status } => {
            let status = match status {
                Some(s) => Some(
                    ProposalStatus::parse_str(&s)
                        .ok_or_else(|| anyhow!("unknown proposal status: {s}"))?,
                ),
                None => None,
            };
            let proposals = coordinator.list_proposals(status).await?;
            let human = TableFormatter::new().format_proposals(&proposals);
            output(
                &ProposalListOutput {
                    proposals: proposals
                        .iter()
                        .map(|p| serde_json::to_value(p).unwrap_or_default())
                        .collect(),
                    human,
                },
                json_mode,
            );
        }
    }

    Ok(())
}
