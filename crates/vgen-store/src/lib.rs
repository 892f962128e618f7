//! Job store tiers.
//!
//! This crate provides:
//! - The `JobStore` contract shared by every tier
//! - A volatile in-process cache
//! - A Postgres tier with upsert-with-coalesce
//! - A Supabase (PostgREST) tier that replays idempotent requests
//! - `TierChain` for fan-out writes and priority-ordered reads

pub mod chain;
pub mod error;
pub mod memory;
pub mod metrics;
pub mod postgres;
pub mod retry;
mod row;
pub mod store;
pub mod supabase;

pub use chain::{TierChain, WriteReport};
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use postgres::{PostgresConfig, PostgresStore};
pub use retry::{PostgrestRequest, RetryConfig};
pub use store::{JobStore, StoreTier};
pub use supabase::{SupabaseConfig, SupabaseStore};
