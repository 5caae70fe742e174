//! Bus message envelope.
//!
//! The Bus carries two shapes of traffic: fire-and-forget direct messages
//! delivered to a single agent's mailbox, and broadcast messages fanned out
//! to every agent in a swarm. Queries are direct messages that expect a
//! correlated reply within a deadline (§4.3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::agent::AgentId;
use super::swarm::SwarmId;

/// Delivery priority, used to jump a message ahead of lower-priority
/// traffic already queued in a recipient's mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessagePriority {
    /// Ordinary traffic.
    Normal,
    /// Delivered ahead of normal-priority messages.
    High,
}

impl Default for MessagePriority {
    fn default() -> Self {
        Self::Normal
    }
}

/// Where a message is headed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MessageTarget {
    /// A single agent's mailbox.
    Agent(AgentId),
    /// Every agent currently in the swarm.
    Broadcast,
}

/// A message's payload kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageBody {
    /// A task assignment notification.
    TaskAssigned {
        /// The assigned task's id, serialized as-is to avoid a dependency
        /// cycle with `task`.
        task_id: Uuid,
    },
    /// A request for information, expecting a `QueryResponse` reply
    /// correlated on `correlation_id`.
    Query {
        /// Matched against the eventual response.
        correlation_id: Uuid,
        /// Free-form query payload.
        payload: serde_json::Value,
    },
    /// A reply to a prior `Query`.
    QueryResponse {
        /// Matches the originating query's `correlation_id`.
        correlation_id: Uuid,
        /// Free-form response payload.
        payload: serde_json::Value,
    },
    /// An arbitrary application-defined payload.
    Custom(serde_json::Value),
}

/// An envelope carried on the Bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier, primarily for tracing.
    pub id: Uuid,
    /// Owning swarm.
    pub swarm_id: SwarmId,
    /// Sender, if the message did not originate from the coordinator itself.
    pub from: Option<AgentId>,
    /// Recipient(s).
    pub target: MessageTarget,
    /// Delivery priority.
    pub priority: MessagePriority,
    /// Payload.
    pub body: MessageBody,
    /// When the message was sent.
    pub sent_at: DateTime<Utc>,
}

impl Message {
    /// Builds a direct message to a single agent.
    #[must_use]
    pub fn direct(swarm_id: SwarmId, from: Option<AgentId>, to: AgentId, body: MessageBody) -> Self {
        Self {
            id: Uuid::new_v4(),
            swarm_id,
            from,
            target: MessageTarget::Agent(to),
            priority: MessagePriority::default(),
            body,
            sent_at: Utc::now(),
        }
    }

    /// Builds a broadcast message to every agent in the swarm.
    #[must_use]
    pub fn broadcast(swarm_id: SwarmId, from: Option<AgentId>, body: MessageBody) -> Self {
        Self {
            id: Uuid::new_v4(),
            swarm_id,
            from,
            target: MessageTarget::Broadcast,
            priority: MessagePriority::default(),
            body,
            sent_at: Utc::now(),
        }
    }

    /// Builder: sets delivery priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: MessagePriority) -> Self {
        self.priority = priority;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_message_targets_a_single_agent() {
        let agent = AgentId::new();
        let msg = Message::direct(
            SwarmId::new(),
            None,
            agent,
            MessageBody::Custom(serde_json::json!({"hello": "world"})),
        );
        matches!(msg.target, MessageTarget::Agent(id) if id == agent);
    }

    #[test]
    fn default_priority_is_normal() {
        let msg = Message::broadcast(SwarmId::new(), None, MessageBody::Custom(serde_json::json!(1)));
        assert_eq!(msg.priority, MessagePriority::Normal);
    }
}
