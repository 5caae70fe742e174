//! In-process fallback store used when the durable SQLite store is
//! unavailable (`CoordinatorError::StoreUnavailable`, §7). Implements every
//! repository port over `parking_lot`-guarded `HashMap`s so the coordinator
//! can keep serving a swarm for the remainder of the process's lifetime
//! without durability guarantees.

mod agent_repository;
mod consensus_repository;
mod memory_repository;
mod swarm_repository;
mod task_repository;

pub use agent_repository::InMemoryAgentRepository;
pub use consensus_repository::InMemoryConsensusRepository;
pub use memory_repository::InMemoryMemoryRepository;
pub use swarm_repository::InMemorySwarmRepository;
pub use task_repository::InMemoryTaskRepository;
