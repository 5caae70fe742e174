//! Hive-Mind Coordinator
//!
//! A bounded-pool supervisor that accepts a natural-language objective,
//! spawns a Queen-led swarm of heterogeneous worker agents, schedules
//! tasks by capability match, runs quorum-based consensus among agents,
//! persists all state to an embedded store, and auto-scales the pool as
//! demand shifts:
//! - Hexagonal layout: [`domain`] (models, errors, repository ports),
//!   [`adapters`] (SQLite and in-memory implementations of those ports),
//!   [`services`] (scheduler, consensus, queen, memory, bus, event bus),
//!   and [`coordinator`] (the public API wiring them together).
//! - [`infrastructure`] carries the process-level concerns: hierarchical
//!   config loading and structured logging.
//! - [`cli`] is the `hivemind` binary's command surface over
//!   [`coordinator::Coordinator`].

pub mod adapters;
pub mod cli;
pub mod coordinator;
pub mod domain;
pub mod infrastructure;
pub mod services;

pub use coordinator::Coordinator;
