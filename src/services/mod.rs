//! Application services for the Hive-Mind Coordinator.

pub mod agent_pool;
pub mod bus;
pub mod consensus;
pub mod dependency_resolver;
pub mod event_bus;
pub mod memory_service;
pub mod queen;
pub mod scheduler;

pub use agent_pool::AgentPool;
pub use bus::{Bus, BusStats};
pub use consensus::Consensus;
pub use dependency_resolver::DependencyResolver;
pub use event_bus::{EventBus, RecvError, Subscription};
pub use memory_service::{MemoryService, MemoryStats};
pub use queen::{Queen, ScaleAction};
pub use scheduler::Scheduler;
