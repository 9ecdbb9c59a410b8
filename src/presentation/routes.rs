use crate::presentation::auth::{login, signup};
use crate::presentation::handlers::{health_check, json_error_handler};
use crate::presentation::summarize::summarize;
use actix_web::web;

pub const ROUTES: &str = "GET /api/health, POST /api/signup, POST /api/login, POST /api/summarize";

/// Mounts the `/api` scope. Shared by the server and the integration tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .service(
            web::scope("/api")
                .route("/health", web::get().to(health_check))
                .route("/signup", web::post().to(signup))
                .route("/login", web::post().to(login))
                .route("/summarize", web::post().to(summarize)),
        );
}
