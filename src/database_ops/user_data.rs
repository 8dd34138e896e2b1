//! Postgres persistence for enriched identities.
//!
//! Batches go through `user_data_staging` (TRUNCATE, COPY, one merge) inside a single
//! transaction; single-record CRUD talks to `user_data` directly. The staging table is
//! shared, so only one batch writer may run at a time.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::db::Db;
use crate::error::SyncError;
use crate::leaderboard::{EnrichedRecord, RecordSink};

pub const USER_DATA_TABLE: &str = "user_data";
pub const STAGING_TABLE: &str = "user_data_staging";

/// NULL marker in the staging CSV; distinguishes NULL from an empty string.
const CSV_NULL: &str = r"\N";

const TRUNCATE_STAGING: &str = "TRUNCATE user_data_staging";

const COPY_STAGING: &str = r"COPY user_data_staging (username, user_slug, user_avatar, country_code, country_name, real_name, typename, total_problems_solved, total_submissions) FROM STDIN WITH (FORMAT csv, NULL '\N')";

// DISTINCT ON keeps a repeated username within one batch from hitting the same row twice.
const MERGE_STAGING: &str = r#"
INSERT INTO user_data (
  username, user_slug, user_avatar, country_code, country_name,
  real_name, typename, total_problems_solved, total_submissions
)
SELECT DISTINCT ON (username)
  username, user_slug, user_avatar, country_code, country_name,
  real_name, typename, total_problems_solved, total_submissions
FROM user_data_staging
ORDER BY username
ON CONFLICT (username) DO UPDATE SET
  user_slug = EXCLUDED.user_slug,
  user_avatar = EXCLUDED.user_avatar,
  country_code = EXCLUDED.country_code,
  country_name = EXCLUDED.country_name,
  real_name = EXCLUDED.real_name,
  typename = EXCLUDED.typename,
  total_problems_solved = EXCLUDED.total_problems_solved,
  total_submissions = EXCLUDED.total_submissions,
  updated_at = now()
"#;

const USER_COLUMNS: &str = "id, username, user_slug, user_avatar, country_code, country_name, real_name, typename, total_problems_solved, total_submissions, created_at, updated_at";

/// Row of `user_data` as served by the API.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub user_slug: String,
    pub user_avatar: Option<String>,
    pub country_code: Option<String>,
    pub country_name: Option<String>,
    pub real_name: Option<String>,
    pub typename: Option<String>,
    pub total_problems_solved: i32,
    pub total_submissions: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update; `None` leaves the stored column unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub user_slug: Option<String>,
    pub user_avatar: Option<String>,
    pub country_code: Option<String>,
    pub country_name: Option<String>,
    pub real_name: Option<String>,
    pub typename: Option<String>,
    pub total_problems_solved: Option<i32>,
    pub total_submissions: Option<i32>,
}

#[derive(Clone)]
pub struct UserDataStore {
    db: Db,
}

impl UserDataStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    /// Stage and merge one batch atomically; returns rows inserted or updated.
    #[instrument(skip(self, batch), fields(batch = batch.len()))]
    pub async fn upsert_batch(&self, batch: &[EnrichedRecord]) -> Result<u64, SyncError> {
        if batch.is_empty() {
            return Ok(0);
        }
        let payload = encode_staging_csv(batch)?;

        // Any early return drops `tx`, which rolls the whole batch back.
        let mut tx = self.db.pool.begin().await?;
        sqlx::query(TRUNCATE_STAGING).execute(&mut *tx).await?;

        let mut copy = tx.copy_in_raw(COPY_STAGING).await?;
        copy.send(Bytes::from(payload)).await?;
        let staged = copy.finish().await?;

        let merged = sqlx::query(MERGE_STAGING)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;

        debug!(staged, merged, "batch merged into user_data");
        Ok(merged)
    }

    #[instrument(skip(self, record), fields(username = %record.username))]
    pub async fn create(&self, record: &EnrichedRecord) -> Result<UserRow, SyncError> {
        let sql = format!(
            "INSERT INTO user_data (username, user_slug, user_avatar, country_code, country_name, real_name, typename, total_problems_solved, total_submissions)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(&record.username)
            .bind(&record.user_slug)
            .bind(&record.user_avatar)
            .bind(&record.country_code)
            .bind(&record.country_name)
            .bind(&record.real_name)
            .bind(&record.typename)
            .bind(record.total_problems_solved)
            .bind(record.total_submissions)
            .fetch_one(&self.db.pool)
            .await?;
        Ok(row)
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<UserRow>, SyncError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM user_data WHERE username = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(username)
            .fetch_optional(&self.db.pool)
            .await?;
        Ok(row)
    }

    /// Returns false when no row matched.
    pub async fn delete_by_username(&self, username: &str) -> Result<bool, SyncError> {
        let done = sqlx::query("DELETE FROM user_data WHERE username = $1")
            .bind(username)
            .execute(&self.db.pool)
            .await?;
        Ok(done.rows_affected() > 0)
    }

    #[instrument(skip(self, update))]
    pub async fn update_by_username(
        &self,
        username: &str,
        update: &UserUpdate,
    ) -> Result<Option<UserRow>, SyncError> {
        let sql = format!(
            "UPDATE user_data SET
               user_slug = COALESCE($2, user_slug),
               user_avatar = COALESCE($3, user_avatar),
               country_code = COALESCE($4, country_code),
               country_name = COALESCE($5, country_name),
               real_name = COALESCE($6, real_name),
               typename = COALESCE($7, typename),
               total_problems_solved = COALESCE($8, total_problems_solved),
               total_submissions = COALESCE($9, total_submissions),
               updated_at = now()
             WHERE username = $1
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(username)
            .bind(&update.user_slug)
            .bind(&update.user_avatar)
            .bind(&update.country_code)
            .bind(&update.country_name)
            .bind(&update.real_name)
            .bind(&update.typename)
            .bind(update.total_problems_solved)
            .bind(update.total_submissions)
            .fetch_optional(&self.db.pool)
            .await?;
        Ok(row)
    }

    /// Users of one country, best first: most solved, then fewest submissions.
    pub async fn list_by_country(
        &self,
        country_code: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<UserRow>, SyncError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM user_data
             WHERE country_code = $1
             ORDER BY total_problems_solved DESC, total_submissions ASC, username ASC
             LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(country_code)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.db.pool)
            .await?;
        Ok(rows)
    }

    pub async fn count_by_country(&self, country_code: &str) -> Result<i64, SyncError> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_data WHERE country_code = $1")
            .bind(country_code)
            .fetch_one(&self.db.pool)
            .await?;
        Ok(n)
    }
}

#[async_trait]
impl RecordSink for UserDataStore {
    async fn upsert(&self, batch: &[EnrichedRecord]) -> Result<u64, SyncError> {
        self.upsert_batch(batch).await
    }
}

fn encode_staging_csv(batch: &[EnrichedRecord]) -> Result<Vec<u8>, SyncError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(vec![]);
    for r in batch {
        let solved = r.total_problems_solved.to_string();
        let submissions = r.total_submissions.to_string();
        writer.write_record([
            r.username.as_str(),
            r.user_slug.as_str(),
            nullable(&r.user_avatar),
            nullable(&r.country_code),
            nullable(&r.country_name),
            nullable(&r.real_name),
            nullable(&r.typename),
            solved.as_str(),
            submissions.as_str(),
        ])?;
    }
    writer
        .into_inner()
        .map_err(|e| SyncError::StagingEncode(csv::Error::from(e.into_error())))
}

fn nullable(v: &Option<String>) -> &str {
    v.as_deref().unwrap_or(CSV_NULL)
}
