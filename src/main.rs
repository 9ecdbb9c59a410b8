use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use std::sync::Arc;
use summarize_api::application::auth_service::AuthService;
use summarize_api::application::summarization_service::SummarizationService;
use summarize_api::data::mysql::Database;
use summarize_api::infrastructure::config::AppConfig;
use summarize_api::infrastructure::inference::HuggingFaceClient;
use summarize_api::infrastructure::logging::init_logging;
use summarize_api::presentation::handlers::AppState;
use summarize_api::presentation::middleware::{RequestIdMiddleware, TimingMiddleware};
use summarize_api::presentation::routes::{ROUTES, configure};
use tracing::{error, info};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    init_logging("info");

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };

    // No reconnect strategy: without a database at startup there is nothing to serve
    info!("Connecting to MySQL");
    let database = match Database::connect(&config.database).await {
        Ok(database) => database,
        Err(e) => {
            error!(error = ?e, "MySQL connection failed");
            std::process::exit(1);
        }
    };
    if let Err(e) = database.ensure_schema().await {
        error!(error = ?e, "Could not prepare users table");
        std::process::exit(1);
    }
    info!("MySQL connection successful");

    let gateway = match HuggingFaceClient::new(
        config.inference.base_url.clone(),
        config.inference.api_key.clone(),
    ) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "Could not build inference client");
            std::process::exit(1);
        }
    };

    let state = web::Data::new(AppState {
        auth_service: AuthService::new(Arc::new(database.users())),
        summarization_service: SummarizationService::new(Arc::new(gateway)),
        max_upload_bytes: config.max_upload_bytes,
    });

    let server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Cors::permissive())
            .wrap(TimingMiddleware)
            .wrap(RequestIdMiddleware)
            .configure(configure)
    });

    let (host, port) = config.bind_address();
    let server = server.bind((host.as_str(), port))?;
    info!(host = %host, port = port, routes = ROUTES, "Starting HTTP server");
    server.run().await
}
