//! Leaderboard synchronization pipeline.
//!
//! page fetch -> username extraction -> concurrent enrichment -> batch upsert,
//! one page at a time, driven by [`SyncController`].

pub mod controller;
pub mod enrich;
pub mod extract;
pub mod record;

use async_trait::async_trait;

use crate::database_ops::leetcode::types::{IdentityStats, LeaderboardPage};
use crate::error::SyncError;

pub use controller::{ControllerError, RunReport, RunState, SyncController, SyncDefaults, SyncOptions, SyncStatus};
pub use enrich::{enrich, EnrichOutcome};
pub use extract::extract_usernames;
pub use record::EnrichedRecord;

/// Upstream queries the pipeline depends on.
#[async_trait]
pub trait LeaderboardApi: Send + Sync {
    async fn fetch_page(&self, page: u32) -> Result<LeaderboardPage, SyncError>;

    async fn fetch_identity(&self, username: &str) -> Result<IdentityStats, SyncError>;

    /// Fetch and flatten one identity into its persisted shape.
    async fn fetch_record(&self, username: &str) -> Result<EnrichedRecord, SyncError> {
        let stats = self.fetch_identity(username).await?;
        EnrichedRecord::from_stats(stats)
    }
}

/// Durable destination for enriched batches.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Merge the whole batch or nothing; returns the number of rows written.
    async fn upsert(&self, batch: &[EnrichedRecord]) -> Result<u64, SyncError>;
}
