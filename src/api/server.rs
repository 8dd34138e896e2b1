// API server implementation using actix-web

use std::sync::Arc;
use std::time::Instant;

use crate::api::handlers::AppState;
use crate::api::{middleware, routes};
use crate::database_ops::leetcode::LeetCodeClient;
use crate::database_ops::user_data::UserDataStore;
use crate::leaderboard::{LeaderboardApi, SyncController, SyncDefaults};
use crate::util::env::{env_opt, env_parse, init_env};
use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};

pub const DEFAULT_PORT: u16 = 8888;

pub struct ApiServer {
    pub host: String,
    pub port: u16,
    pub allowed_origins: String,
}

impl ApiServer {
    /// API_HOST, API_PORT, ALLOWED_ORIGINS.
    pub fn from_env() -> Result<Self> {
        init_env();

        let host = env_opt("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match env_opt("API_PORT") {
            Some(raw) => raw.trim().parse().context("Invalid API_PORT")?,
            None => DEFAULT_PORT,
        };
        let allowed_origins = env_opt("ALLOWED_ORIGINS").unwrap_or_else(|| "*".to_string());

        Ok(Self {
            host,
            port,
            allowed_origins,
        })
    }

    /// Wire the controller, store and client, then serve until shutdown.
    pub async fn run(self, users: UserDataStore, client: LeetCodeClient) -> Result<()> {
        let bind_addr = format!("{}:{}", self.host, self.port);
        let api: Arc<dyn LeaderboardApi> = Arc::new(client);
        let controller = SyncController::new(
            api.clone(),
            Arc::new(users.clone()),
            SyncDefaults::from_env(),
        );
        let workers: usize = env_parse("API_WORKERS", 2);

        tracing::info!(
            host = %self.host,
            port = %self.port,
            origins = %self.allowed_origins,
            "starting leaderboard API server"
        );

        let state = web::Data::new(AppState {
            controller: controller.clone(),
            users,
            api,
            started_at: Instant::now(),
        });
        let allowed_origins = self.allowed_origins.clone();

        HttpServer::new(move || {
            let (logger, compress) = middleware::setup_middleware();
            let cors = middleware::setup_cors(&allowed_origins);

            App::new()
                .app_data(state.clone())
                .wrap(logger)
                .wrap(compress)
                .wrap(cors)
                .configure(routes::configure_routes)
        })
        .workers(workers.max(1))
        .bind(&bind_addr)
        .with_context(|| format!("Failed to bind to {}", bind_addr))?
        .run()
        .await
        .context("HTTP server error")?;

        // A run in flight sees the stop at its next page boundary.
        if controller.stop() {
            tracing::info!("server stopped; sync run asked to stop");
        }
        Ok(())
    }
}
