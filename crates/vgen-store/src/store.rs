//! The contract every job store tier implements.

use std::fmt;

use async_trait::async_trait;

use vgen_models::{JobId, JobRecord};

use crate::error::StoreResult;

/// Identifies a tier in logs, metrics and readiness output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreTier {
    Memory,
    Postgres,
    Supabase,
}

impl StoreTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreTier::Memory => "memory",
            StoreTier::Postgres => "postgres",
            StoreTier::Supabase => "supabase",
        }
    }

    /// Whether the tier survives a process restart.
    pub fn is_persistent(&self) -> bool {
        !matches!(self, StoreTier::Memory)
    }
}

impl fmt::Display for StoreTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A key-value store of job records.
///
/// `put` is an upsert-with-coalesce: null fields of the incoming record
/// never clear stored values, and a stored terminal status is kept.
#[async_trait]
pub trait JobStore: Send + Sync {
    fn tier(&self) -> StoreTier;

    async fn put(&self, job: &JobRecord) -> StoreResult<()>;

    async fn get(&self, id: &JobId) -> StoreResult<Option<JobRecord>>;

    /// Connectivity check for readiness probes.
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
