//! LeetCode global-ranking synchronization.
//!
//! Pages of the global leaderboard are fetched over GraphQL, each listed identity
//! is enriched with its profile and submission stats by a bounded worker pool, and
//! every page lands in Postgres as one staged, transactional upsert.

pub mod api;
pub mod database_ops;
pub mod error;
pub mod leaderboard;
pub mod logging;

pub mod util {
    pub mod env;
}

pub use error::SyncError;
