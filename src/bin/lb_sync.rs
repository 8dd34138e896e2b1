use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use leetcode_ranking::database_ops::db::Db;
use leetcode_ranking::database_ops::leetcode::LeetCodeClient;
use leetcode_ranking::database_ops::user_data::UserDataStore;
use leetcode_ranking::leaderboard::{
    extract_usernames, LeaderboardApi, SyncController, SyncDefaults, SyncOptions,
};
use leetcode_ranking::logging::{init_logging, DEFAULT_FILTER};
use leetcode_ranking::util::env;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "lb_sync", version, about = "LeetCode leaderboard sync CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Sync leaderboard pages into Postgres (Ctrl-C stops after the current page)
    Run {
        /// First page to sync (1-based)
        #[arg(long, default_value_t = 1)]
        start_page: i64,
        /// Number of pages to sync; 0 or unset means all (falls back to SYNC_PAGES)
        #[arg(long)]
        pages: Option<i64>,
        /// Concurrent enrichment workers (falls back to SYNC_WORKERS)
        #[arg(long)]
        workers: Option<usize>,
        /// Per-worker politeness delay in milliseconds (falls back to SYNC_DELAY_MS)
        #[arg(long)]
        delay_ms: Option<u64>,
        /// Abort the run after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
        /// Optional override for the database URL
        #[arg(long)]
        db_url: Option<String>,
    },
    /// Fetch one ranking page and print its usernames
    Page { page: u32 },
    /// Fetch and print one enriched identity as JSON
    User {
        username: String,
        /// Also upsert the record into user_data
        #[arg(long, default_value_t = false)]
        save: bool,
        #[arg(long)]
        db_url: Option<String>,
    },
    /// Print one stored user row as JSON
    Show {
        username: String,
        #[arg(long)]
        db_url: Option<String>,
    },
}

async fn connect(db_url: Option<String>) -> Result<UserDataStore> {
    let url = match db_url {
        Some(u) => u,
        None => env::db_url()?,
    };
    let max_connections: u32 = env::env_parse("DB_MAX_CONNS", 10u32);
    let db = Db::connect(&url, max_connections)
        .await
        .context("connect to database")?;
    Ok(UserDataStore::new(db))
}

#[tokio::main]
async fn main() -> Result<()> {
    env::init_env();
    init_logging(DEFAULT_FILTER)?;
    let cli = Cli::parse();
    let client = LeetCodeClient::from_env()?;

    match cli.command {
        Commands::Run {
            start_page,
            pages,
            workers,
            delay_ms,
            timeout_secs,
            db_url,
        } => {
            env::preflight_check(
                "lb_sync run",
                &[],
                &["DATABASE_URL", "POSTGRES_HOST", "LEETCODE_GRAPHQL_URL", "SYNC_WORKERS", "SYNC_DELAY_MS"],
            )?;
            let store = connect(db_url).await?;
            let controller = SyncController::new(
                Arc::new(client),
                Arc::new(store),
                SyncDefaults::from_env(),
            );

            let on_signal = controller.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("ctrl-c received; stopping after the current page");
                    on_signal.stop();
                }
            });

            let opts = SyncOptions {
                start_page: Some(start_page),
                pages,
                workers,
                delay: delay_ms.map(Duration::from_millis),
            };
            let run = controller.run(opts);
            let report = match timeout_secs {
                Some(secs) => tokio::time::timeout(Duration::from_secs(secs), run)
                    .await
                    .map_err(|_| anyhow!("sync run timed out after {secs}s"))??,
                None => run.await?,
            };
            info!(?report, "sync complete");
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Page { page } => {
            let data = client.fetch_page(page.max(1)).await?;
            info!(
                page,
                total_pages = data.total_pages,
                total_users = data.total_users,
                "page fetched"
            );
            for username in extract_usernames(&data) {
                println!("{username}");
            }
        }
        Commands::User {
            username,
            save,
            db_url,
        } => {
            let record = client.fetch_record(username.trim()).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
            if save {
                let store = connect(db_url).await?;
                let rows = store.upsert_batch(std::slice::from_ref(&record)).await?;
                info!(username = %record.username, rows, "record saved");
            }
        }
        Commands::Show { username, db_url } => {
            let store = connect(db_url).await?;
            let row = store
                .get_by_username(username.trim())
                .await?
                .ok_or_else(|| anyhow!("user {username} not found"))?;
            println!("{}", serde_json::to_string_pretty(&row)?);
        }
    }
    Ok(())
}
