//! In-memory `SwarmRepository` fallback.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::domain::errors::{CoordinatorError, CoordinatorResult};
use crate::domain::models::{Swarm, SwarmId, SwarmStatus};
use crate::domain::ports::SwarmRepository;

#[derive(Default)]
pub struct InMemorySwarmRepository {
    swarms: RwLock<HashMap<SwarmId, Swarm>>,
}

impl InMemorySwarmRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SwarmRepository for InMemorySwarmRepository {
    async fn create(&self, swarm: &Swarm) -> CoordinatorResult<()> {
        self.swarms.write().insert(swarm.id, swarm.clone());
        Ok(())
    }

    async fn get(&self, id: SwarmId) -> CoordinatorResult<Option<Swarm>> {
        Ok(self.swarms.read().get(&id).cloned())
    }

    async fn update(&self, swarm: &Swarm) -> CoordinatorResult<()> {
        let mut swarms = self.swarms.write();
        if !swarms.contains_key(&swarm.id) {
            return Err(CoordinatorError::UnknownEntity {
                kind: "swarm",
                id: swarm.id.to_string(),
            });
        }
        swarms.insert(swarm.id, swarm.clone());
        Ok(())
    }

    async fn list(&self, status: Option<SwarmStatus>) -> CoordinatorResult<Vec<Swarm>> {
        let mut out: Vec<Swarm> = self
            .swarms
            .read()
            .values()
            .filter(|s| status.is_none_or(|want| s.status == want))
            .cloned()
            .collect();
        out.sort_by_key(|s| std::cmp::Reverse(s.created_at));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Topology;

    #[tokio::test]
    async fn create_and_get_round_trips() {
        let repo = InMemorySwarmRepository::new();
        let swarm = Swarm::new("objective", Topology::Hierarchical, 4);
        repo.create(&swarm).await.unwrap();
        let fetched = repo.get(swarm.id).await.unwrap().unwrap();
        assert_eq!(fetched.objective, "objective");
    }

    #[tokio::test]
    async fn update_unknown_swarm_errors() {
        let repo = InMemorySwarmRepository::new();
        let swarm = Swarm::new("ghost", Topology::Mesh, 1);
        assert!(repo.update(&swarm).await.is_err());
    }
}
