//! Domain ports (interfaces) for the Hive-Mind Coordinator.

pub mod agent_repository;
pub mod consensus_repository;
pub mod memory_repository;
pub mod swarm_repository;
pub mod task_repository;

pub use agent_repository::{AgentFilter, AgentRepository};
pub use consensus_repository::ConsensusRepository;
pub use memory_repository::MemoryRepository;
pub use swarm_repository::SwarmRepository;
pub use task_repository::{TaskFilter, TaskRepository};
