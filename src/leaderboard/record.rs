use serde::{Deserialize, Serialize};

use crate::database_ops::leetcode::types::IdentityStats;
use crate::error::SyncError;

/// Normalized unit written to `user_data`, keyed by `username`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub username: String,
    pub user_slug: String,
    pub user_avatar: Option<String>,
    pub country_code: Option<String>,
    pub country_name: Option<String>,
    pub real_name: Option<String>,
    pub typename: Option<String>,
    pub total_problems_solved: i32,
    /// Accepted submissions across all difficulties.
    pub total_submissions: i32,
}

impl EnrichedRecord {
    /// Flatten a profile response. Fails with `MissingAggregateStat` when the
    /// "All" accepted-submission tier is absent.
    pub fn from_stats(stats: IdentityStats) -> Result<Self, SyncError> {
        let (solved, submissions) = match stats.accepted_all() {
            Some(all) => (all.count, all.submissions),
            None => return Err(SyncError::MissingAggregateStat(stats.username)),
        };
        let profile = stats.user.profile;
        Ok(Self {
            username: stats.username,
            user_slug: profile.user_slug,
            user_avatar: profile.user_avatar,
            country_code: profile.country_code,
            country_name: profile.country_name,
            real_name: profile.real_name,
            typename: profile.typename,
            total_problems_solved: solved,
            total_submissions: submissions,
        })
    }
}
