//! Swarm repository port.

use async_trait::async_trait;

use crate::domain::errors::CoordinatorResult;
use crate::domain::models::{Swarm, SwarmId, SwarmStatus};

/// Repository interface for `Swarm` persistence.
#[async_trait]
pub trait SwarmRepository: Send + Sync {
    /// Creates a new swarm.
    async fn create(&self, swarm: &Swarm) -> CoordinatorResult<()>;

    /// Fetches a swarm by id.
    async fn get(&self, id: SwarmId) -> CoordinatorResult<Option<Swarm>>;

    /// Persists an updated swarm.
    async fn update(&self, swarm: &Swarm) -> CoordinatorResult<()>;

    /// Lists every swarm, optionally filtered by status.
    async fn list(&self, status: Option<SwarmStatus>) -> CoordinatorResult<Vec<Swarm>>;
}
