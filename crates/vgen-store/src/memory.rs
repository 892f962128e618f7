//! Volatile in-process job cache.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use vgen_models::{JobId, JobRecord};

use crate::error::StoreResult;
use crate::store::{JobStore, StoreTier};

/// Process-local job map. Cloning shares the same map.
///
/// Contents are lost on restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    jobs: Arc<RwLock<HashMap<JobId, JobRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    fn tier(&self) -> StoreTier {
        StoreTier::Memory
    }

    async fn put(&self, job: &JobRecord) -> StoreResult<()> {
        let mut jobs = self.jobs.write().await;
        let merged = match jobs.get(&job.id) {
            Some(existing) => existing.merge(job),
            None => job.clone(),
        };
        jobs.insert(job.id.clone(), merged);
        Ok(())
    }

    async fn get(&self, id: &JobId) -> StoreResult<Option<JobRecord>> {
        Ok(self.jobs.read().await.get(id).cloned())
    }
}
