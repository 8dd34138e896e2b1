// HTTP API server binary: leaderboard sync control and user endpoints

use anyhow::Result;
use leetcode_ranking::api::ApiServer;
use leetcode_ranking::database_ops::db::Db;
use leetcode_ranking::database_ops::leetcode::LeetCodeClient;
use leetcode_ranking::database_ops::user_data::UserDataStore;
use leetcode_ranking::logging::{init_logging, DEFAULT_FILTER};
use leetcode_ranking::util::env as env_util;

#[actix_web::main]
async fn main() -> Result<()> {
    // Load dotenv/env once (safe to call multiple times)
    env_util::init_env();
    init_logging(DEFAULT_FILTER)?;

    tracing::info!("initializing leaderboard API server");

    let server = ApiServer::from_env()?;
    env_util::preflight_check(
        "api_server",
        &[],
        &["DATABASE_URL", "POSTGRES_HOST", "LEETCODE_GRAPHQL_URL", "API_PORT", "ALLOWED_ORIGINS"],
    )?;

    let database_url = env_util::db_url()?;
    let max_connections: u32 = env_util::env_parse("DB_MAX_CONNS", 10u32);
    let db = Db::connect(&database_url, max_connections).await?;
    tracing::info!("database connected");

    let client = LeetCodeClient::from_env()?;
    server.run(UserDataStore::new(db), client).await?;

    Ok(())
}
