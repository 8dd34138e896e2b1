// API route configuration

use crate::api::handlers;
use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(handlers::health_check))
        .service(
            web::scope("/api/v1")
                // Sync control
                .route("/sync-leaderboard", web::post().to(handlers::start_sync))
                .route("/stop-syncing", web::post().to(handlers::stop_sync))
                .route("/sync-status", web::get().to(handlers::sync_status))
                // Users
                .route("/add-user", web::post().to(handlers::add_user))
                .route("/get-users", web::get().to(handlers::users_by_country))
                .route("/users/{username}", web::get().to(handlers::get_user))
                .route("/users/{username}", web::put().to(handlers::update_user))
                .route("/users/{username}", web::delete().to(handlers::delete_user)),
        );
}
