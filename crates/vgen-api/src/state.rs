//! Application state.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use tracing::info;

use vgen_media::MediaLayout;
use vgen_provider::ProviderClient;
use vgen_store::{
    MemoryStore, PostgresConfig, PostgresStore, SupabaseConfig, SupabaseStore, TierChain,
};
use vgen_tracker::{Composer, JobTracker};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub tracker: Arc<JobTracker>,
    pub composer: Arc<Composer>,
    pub started_at: Instant,
}

impl AppState {
    /// Assemble state from already-built parts.
    pub fn from_parts(
        config: ApiConfig,
        provider: ProviderClient,
        chain: TierChain,
        layout: MediaLayout,
    ) -> Self {
        let composer = Composer::new(provider.http().clone(), layout.clone());
        let tracker = JobTracker::new(provider, chain, layout);

        Self {
            config,
            tracker: Arc::new(tracker),
            composer: Arc::new(composer),
            started_at: Instant::now(),
        }
    }

    /// Create application state from the environment.
    ///
    /// The memory tier is always present. Postgres and Supabase join the
    /// chain only when configured.
    pub async fn from_env(config: ApiConfig) -> anyhow::Result<Self> {
        let provider = ProviderClient::from_env().context("provider client")?;

        let layout = MediaLayout::from_env();
        layout.ensure_dirs().await.context("media directories")?;

        let mut chain = TierChain::new().with_tier(Arc::new(MemoryStore::new()));

        if let Some(pg) = PostgresConfig::from_env() {
            let store = PostgresStore::connect(&pg).await.context("postgres tier")?;
            chain = chain.with_tier(Arc::new(store));
        }

        if let Some(sb) = SupabaseConfig::from_env() {
            let store = SupabaseStore::new(sb).context("supabase tier")?;
            chain = chain.with_tier(Arc::new(store));
        }

        let tiers: Vec<_> = chain.tiers().map(|t| t.as_str()).collect();
        info!(tiers = ?tiers, output = %layout.output_dir.display(), "Job store tiers ready");

        Ok(Self::from_parts(config, provider, chain, layout))
    }

    pub fn uptime_secs(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }
}
