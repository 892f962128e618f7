//! Ranked collection of the configured tiers.

use std::sync::Arc;

use tracing::{debug, warn};

use vgen_models::{JobId, JobLookup, JobRecord};

use crate::error::StoreResult;
use crate::store::{JobStore, StoreTier};

/// Read priority, lowest first. Writes go in the opposite order so the
/// volatile cache sees a record before any persistent tier does.
fn read_rank(tier: StoreTier) -> u8 {
    match tier {
        StoreTier::Supabase => 0,
        StoreTier::Postgres => 1,
        StoreTier::Memory => 2,
    }
}

/// Outcome of a fan-out write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub written: Vec<StoreTier>,
    pub failed: Vec<StoreTier>,
}

impl WriteReport {
    pub fn all_ok(&self) -> bool {
        self.failed.is_empty()
    }
}

/// The configured job store tiers, kept in read-priority order.
#[derive(Clone, Default)]
pub struct TierChain {
    tiers: Vec<Arc<dyn JobStore>>,
}

impl TierChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tier. Tiers are re-ranked on every insert.
    pub fn with_tier(mut self, store: Arc<dyn JobStore>) -> Self {
        self.tiers.push(store);
        self.tiers.sort_by_key(|s| read_rank(s.tier()));
        self
    }

    pub fn tiers(&self) -> impl Iterator<Item = StoreTier> + '_ {
        self.tiers.iter().map(|s| s.tier())
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    /// Write to every tier, cache first. Tier failures are logged and
    /// never propagate.
    pub async fn put_all(&self, job: &JobRecord) -> WriteReport {
        let mut report = WriteReport::default();

        for store in self.tiers.iter().rev() {
            let tier = store.tier();
            match store.put(job).await {
                Ok(()) => {
                    debug!(tier = %tier, task_id = %job.id, status = %job.status, "Job written");
                    report.written.push(tier);
                }
                Err(e) => {
                    warn!(tier = %tier, task_id = %job.id, error = %e, "Job write failed, continuing");
                    report.failed.push(tier);
                }
            }
        }

        report
    }

    /// First hit in read-priority order. A tier read error counts as a miss.
    pub async fn get_first(&self, id: &JobId) -> Option<(StoreTier, JobRecord)> {
        for store in &self.tiers {
            let tier = store.tier();
            match store.get(id).await {
                Ok(Some(record)) => return Some((tier, record)),
                Ok(None) => {}
                Err(e) => {
                    warn!(tier = %tier, task_id = %id, error = %e, "Job read failed, falling back");
                }
            }
        }
        None
    }

    /// Best-known status for an id, or the pending sentinel.
    pub async fn lookup(&self, id: &JobId) -> JobLookup {
        self.get_first(id).await.map(|(_, record)| record).into()
    }

    /// Connectivity of every tier, in read order.
    pub async fn ping_all(&self) -> Vec<(StoreTier, StoreResult<()>)> {
        let mut results = Vec::with_capacity(self.tiers.len());
        for store in &self.tiers {
            results.push((store.tier(), store.ping().await));
        }
        results
    }
}
