use anyhow::Result;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions, PgSslMode},
    PgPool,
};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, instrument};

#[derive(Clone)]
pub struct Db {
    pub pool: PgPool,
}

impl Db {
    // SECURITY: never include raw DSNs in tracing spans (they may contain credentials).
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        Self::connect_with(connect_options(database_url)?, max_connections).await
    }

    /// Connect with prebuilt options (tests use this to pin `search_path`).
    #[instrument(skip(options))]
    pub async fn connect_with(options: PgConnectOptions, max_connections: u32) -> Result<Self> {
        let pool = pool_options(max_connections)
            .connect_with(options)
            .await?;
        info!("connected to db");
        Ok(Self { pool })
    }

    /// Pool that opens connections on first use; startup never blocks on the database.
    #[instrument(skip(database_url))]
    pub fn connect_lazy(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = pool_options(max_connections).connect_lazy_with(connect_options(database_url)?);
        Ok(Self { pool })
    }

    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn connect_options(database_url: &str) -> Result<PgConnectOptions> {
    let mut options = PgConnectOptions::from_str(database_url)?;
    if database_url.contains("sslmode=require") {
        options = options.ssl_mode(PgSslMode::Require);
    }
    // PgBouncer txn mode safe
    Ok(options.statement_cache_capacity(0))
}

fn pool_options(max_connections: u32) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
}
