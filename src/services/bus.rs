//! In-process pub/sub message bus for agent-to-agent and
//! coordinator-to-agent traffic (§4.3).
//!
//! Each agent gets a dedicated `tokio::sync::mpsc` mailbox so direct and
//! query messages are delivered in order per (sender, receiver) pair.
//! Broadcasts fan out to every registered mailbox independently and are
//! not ordered across receivers, matching the component design.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{timeout, Duration};
use uuid::Uuid;

use crate::domain::errors::{CoordinatorError, CoordinatorResult};
use crate::domain::models::{AgentId, Message, MessageBody, MessageTarget, SwarmId};

const MAILBOX_CAPACITY: usize = 256;

struct Endpoint {
    sender: mpsc::Sender<Message>,
}

/// Tracks per-bus delivery counters, exposed through `stats()`.
#[derive(Debug, Clone, Default)]
pub struct BusStats {
    /// Total messages delivered to at least one mailbox.
    pub delivered: u64,
    /// Total broadcasts fanned out.
    pub broadcasts: u64,
    /// Queries that expired before a response arrived.
    pub timed_out_queries: u64,
}

/// The single-process pub/sub bus (§4.3).
pub struct Bus {
    endpoints: RwLock<HashMap<AgentId, Endpoint>>,
    pending_queries: RwLock<HashMap<Uuid, oneshot::Sender<serde_json::Value>>>,
    delivered: AtomicU64,
    broadcasts: AtomicU64,
    timed_out_queries: AtomicU64,
}

impl Bus {
    /// Creates an empty bus with no registered endpoints.
    #[must_use]
    pub fn new() -> Self {
        Self {
            endpoints: RwLock::new(HashMap::new()),
            pending_queries: RwLock::new(HashMap::new()),
            delivered: AtomicU64::new(0),
            broadcasts: AtomicU64::new(0),
            timed_out_queries: AtomicU64::new(0),
        }
    }

    /// Registers a mailbox for `agent_id`, returning the receiving end.
    /// Idempotent: re-registering replaces the old mailbox.
    pub fn register(&self, agent_id: AgentId) -> mpsc::Receiver<Message> {
        let (sender, receiver) = mpsc::channel(MAILBOX_CAPACITY);
        self.endpoints.write().insert(agent_id, Endpoint { sender });
        receiver
    }

    /// Unregisters an agent's mailbox. Draining pending messages before
    /// the deadline is the caller's (Agent Pool's) responsibility; this
    /// just removes the endpoint so nothing more is delivered to it.
    pub fn unregister(&self, agent_id: AgentId) {
        self.endpoints.write().remove(&agent_id);
    }

    /// Delivers a direct or broadcast message. Direct delivery to an
    /// unregistered agent is silently dropped at-most-once, matching the
    /// component design's delivery semantics.
    pub fn send(&self, swarm_id: SwarmId, message: Message) {
        match message.target {
            MessageTarget::Agent(to) => {
                let endpoint = self.endpoints.read();
                if let Some(ep) = endpoint.get(&to) {
                    if ep.sender.try_send(message).is_ok() {
                        self.delivered.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
            MessageTarget::Broadcast => {
                self.broadcasts.fetch_add(1, Ordering::Relaxed);
                let endpoints = self.endpoints.read();
                for ep in endpoints.values() {
                    let _ = ep.sender.try_send(clone_for_broadcast(&message, swarm_id));
                }
                self.delivered
                    .fetch_add(endpoints.len() as u64, Ordering::Relaxed);
            }
        }
    }

    /// Sends a query to `to` and awaits a correlated response, failing
    /// with `QueryTimeout` if none arrives by `deadline`.
    pub async fn query(
        &self,
        swarm_id: SwarmId,
        from: Option<AgentId>,
        to: AgentId,
        payload: serde_json::Value,
        deadline: Duration,
    ) -> CoordinatorResult<serde_json::Value> {
        let correlation_id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();
        self.pending_queries.write().insert(correlation_id, tx);

        let message = Message::direct(
            swarm_id,
            from,
            to,
            MessageBody::Query {
                correlation_id,
                payload,
            },
        );
        self.send(swarm_id, message);

        match timeout(deadline, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => {
                self.pending_queries.write().remove(&correlation_id);
                self.timed_out_queries.fetch_add(1, Ordering::Relaxed);
                Err(CoordinatorError::QueryTimeout(correlation_id))
            }
            Err(_) => {
                self.pending_queries.write().remove(&correlation_id);
                self.timed_out_queries.fetch_add(1, Ordering::Relaxed);
                Err(CoordinatorError::QueryTimeout(correlation_id))
            }
        }
    }

    /// Resolves an outstanding query with its response payload. A no-op
    /// if the correlation id is unknown (already timed out, or bogus).
    pub fn respond(&self, correlation_id: Uuid, payload: serde_json::Value) {
        if let Some(tx) = self.pending_queries.write().remove(&correlation_id) {
            let _ = tx.send(payload);
        }
    }

    /// Snapshot of delivery counters.
    #[must_use]
    pub fn stats(&self) -> BusStats {
        BusStats {
            delivered: self.delivered.load(Ordering::Relaxed),
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            timed_out_queries: self.timed_out_queries.load(Ordering::Relaxed),
        }
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

fn clone_for_broadcast(message: &Message, swarm_id: SwarmId) -> Message {
    Message::broadcast(swarm_id, message.from, clone_body(&message.body)).with_priority(message.priority)
}

fn clone_body(body: &MessageBody) -> MessageBody {
    match body {
        MessageBody::TaskAssigned { task_id } => MessageBody::TaskAssigned { task_id: *task_id },
        MessageBody::Query {
            correlation_id,
            payload,
        } => MessageBody::Query {
            correlation_id: *correlation_id,
            payload: payload.clone(),
        },
        MessageBody::QueryResponse {
            correlation_id,
            payload,
        } => MessageBody::QueryResponse {
            correlation_id: *correlation_id,
            payload: payload.clone(),
        },
        MessageBody::Custom(value) => MessageBody::Custom(value.clone()),
    }
}
