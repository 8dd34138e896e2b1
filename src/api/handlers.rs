// HTTP request handlers for API endpoints

use std::sync::Arc;
use std::time::Instant;

use actix_web::{web, HttpResponse, Result};

use crate::api::models::*;
use crate::database_ops::user_data::{UserDataStore, UserUpdate};
use crate::error::SyncError;
use crate::leaderboard::{ControllerError, LeaderboardApi, SyncController};

/// Shared handler state.
pub struct AppState {
    pub controller: SyncController,
    pub users: UserDataStore,
    pub api: Arc<dyn LeaderboardApi>,
    pub started_at: Instant,
}

/// Health check endpoint
pub async fn health_check(state: web::Data<AppState>) -> Result<HttpResponse> {
    let db_status = match state.users.db().ping().await {
        Ok(()) => "connected",
        Err(_) => "disconnected",
    };

    let response = ApiResponse::success(HealthResponse {
        status: "healthy".to_string(),
        database: db_status.to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    });

    Ok(HttpResponse::Ok().json(response))
}

/// Start a leaderboard sync in the background.
pub async fn start_sync(
    state: web::Data<AppState>,
    payload: Option<web::Json<StartSyncRequest>>,
) -> Result<HttpResponse> {
    let req = payload.map(web::Json::into_inner).unwrap_or_default();
    tracing::info!(page = ?req.page, pages = ?req.pages, workers = ?req.workers, "sync start requested");

    match state.controller.start(req.into()) {
        Ok(handle) => {
            // The run reports its own outcome through tracing; only panics surface here.
            tokio::spawn(async move {
                if let Err(e) = handle.await {
                    tracing::error!(error = %e, "sync task panicked");
                }
            });
            Ok(HttpResponse::Accepted().json(ApiResponse::success(state.controller.status())))
        }
        Err(e @ ControllerError::AlreadyRunning { .. }) => {
            Ok(HttpResponse::Conflict().json(ApiResponse::<()>::error(e.to_string())))
        }
        Err(e) => Ok(HttpResponse::InternalServerError().json(ApiResponse::<()>::error(e.to_string()))),
    }
}

pub async fn stop_sync(state: web::Data<AppState>) -> Result<HttpResponse> {
    let stopping = state.controller.stop();
    Ok(HttpResponse::Ok().json(ApiResponse::success(StopSyncResponse { stopping })))
}

pub async fn sync_status(state: web::Data<AppState>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(ApiResponse::success(state.controller.status())))
}

/// Fetch one identity upstream and insert it.
pub async fn add_user(
    state: web::Data<AppState>,
    payload: web::Json<CreateUserRequest>,
) -> Result<HttpResponse> {
    let username = payload.username.trim();
    if username.is_empty() {
        return Ok(HttpResponse::BadRequest().json(ApiResponse::<()>::error("username is required")));
    }

    let record = match state.api.fetch_record(username).await {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!(username, error = %e, "add-user fetch failed");
            return Ok(error_response(&e));
        }
    };
    match state.users.create(&record).await {
        Ok(row) => {
            tracing::info!(username = %row.username, id = row.id, "user created");
            Ok(HttpResponse::Created().json(ApiResponse::success(row)))
        }
        Err(e) => {
            tracing::error!(username, error = %e, "add-user insert failed");
            Ok(error_response(&e))
        }
    }
}

/// Users of one country, ranked.
pub async fn users_by_country(
    state: web::Data<AppState>,
    query: web::Query<UsersByCountryQuery>,
) -> Result<HttpResponse> {
    let page = match query.validate() {
        Ok(page) => page,
        Err(msg) => return Ok(HttpResponse::BadRequest().json(ApiResponse::<()>::error(msg))),
    };

    let listed = state
        .users
        .list_by_country(&page.country, page.limit, page.offset())
        .await;
    let counted = state.users.count_by_country(&page.country).await;
    match (listed, counted) {
        (Ok(users), Ok(total_count)) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            UsersByCountryResponse {
                users,
                total_count,
                page: page.page,
                limit: page.limit,
            },
        ))),
        (Err(e), _) | (_, Err(e)) => {
            tracing::error!(country = %page.country, error = %e, "list users failed");
            Ok(error_response(&e))
        }
    }
}

pub async fn get_user(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let username = path.into_inner();
    match state.users.get_by_username(username.trim()).await {
        Ok(Some(row)) => Ok(HttpResponse::Ok().json(ApiResponse::success(row))),
        Ok(None) => Ok(not_found(&username)),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn update_user(
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<UserUpdate>,
) -> Result<HttpResponse> {
    let username = path.into_inner();
    match state.users.update_by_username(username.trim(), &payload).await {
        Ok(Some(row)) => {
            tracing::info!(username = %row.username, "user updated");
            Ok(HttpResponse::Ok().json(ApiResponse::success(row)))
        }
        Ok(None) => Ok(not_found(&username)),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn delete_user(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let username = path.into_inner();
    match state.users.delete_by_username(username.trim()).await {
        Ok(true) => {
            tracing::info!(username = %username, "user deleted");
            Ok(HttpResponse::Ok().json(ApiResponse::success(serde_json::json!({
                "deleted": username
            }))))
        }
        Ok(false) => Ok(not_found(&username)),
        Err(e) => Ok(error_response(&e)),
    }
}

fn not_found(username: &str) -> HttpResponse {
    HttpResponse::NotFound().json(ApiResponse::<()>::error(format!("user {username} not found")))
}

fn error_response(e: &SyncError) -> HttpResponse {
    let body = ApiResponse::<()>::error(e.to_string());
    if e.is_skip() {
        HttpResponse::NotFound().json(body)
    } else if e.is_conflict() {
        HttpResponse::Conflict().json(body)
    } else if e.is_persistence() {
        HttpResponse::InternalServerError().json(ApiResponse::<()>::error("internal server error"))
    } else {
        HttpResponse::BadGateway().json(body)
    }
}
