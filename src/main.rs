pub mod api;
mod cache;
mod config;
mod models;
mod providers;
mod scheduler;
mod tasks;

use std::sync::Arc;

use sqlx::SqlitePool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use config::Config;
use providers::directions::{Directions, DirectionsService, GoogleDirectionsClient};
use tasks::TaskManager;

#[derive(OpenApi)]
#[openapi(
    info(title = "Paraplan API", version = "0.2.0"),
    paths(
        api::scheduling::calculate::calculate,
        api::scheduling::tasks::enqueue,
        api::scheduling::tasks::get_task,
        api::health::health_check,
    ),
    components(schemas(
        api::ErrorResponse,
        api::health::HealthResponse,
        api::scheduling::tasks::EnqueueResponse,
        api::scheduling::tasks::TaskStatusResponse,
        models::SchedulingRequest,
        models::SchedulingResponse,
        models::SchedulingResult,
        models::SchedulingData,
        models::ShuttleTrips,
        models::TripEntry,
        tasks::TaskStatus,
    )),
    tags(
        (name = "scheduling", description = "Synchronous and asynchronous shuttle planning"),
        (name = "health", description = "Service health check")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info,sqlx=warn".into()),
        )
        .init();

    // Load config
    let config = Arc::new(Config::from_env().expect("Failed to load configuration"));
    tracing::info!(
        port = config.port,
        origin_check = config.enable_origin_check,
        cache_enabled = config.cache.enable,
        "Loaded configuration"
    );

    // Build CORS layer based on config
    let cors_layer = if config.enable_origin_check {
        tracing::info!(origins = ?config.acceptable_origins, "CORS: Restricting to configured origins");
        let origins: Vec<_> = config
            .acceptable_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers([axum::http::header::CONTENT_TYPE])
    } else {
        CorsLayer::permissive()
    };

    // Initialize SQLite database
    let db_file = std::path::PathBuf::from(&config.database_path);
    if let Some(parent) = db_file.parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!("Could not create database directory: {}", e);
            }
        }
    }
    let db_url = format!("sqlite:{}?mode=rwc", db_file.display());
    let pool = SqlitePool::connect(&db_url)
        .await
        .expect("Failed to connect to SQLite database");

    // Run migrations
    let migrator = sqlx::migrate!("./migrations");
    migrator.run(&pool).await.expect("Failed to run migrations");
    tracing::info!("Database migrations completed");

    // Directions service with the configured cache backend
    let cache = cache::from_config(&config.cache, &pool);
    let client = GoogleDirectionsClient::new(config.google_api_token.clone())
        .expect("Failed to build directions client");
    let directions: Arc<dyn Directions> = Arc::new(DirectionsService::new(client, cache.clone()));

    // Start task manager in background
    let manager = Arc::new(TaskManager::new(
        pool.clone(),
        directions.clone(),
        cache,
        &config,
    ));
    let store = manager.store();
    let manager_clone = manager.clone();
    tokio::spawn(async move {
        manager_clone.start().await;
    });

    // Build the app
    let app = api::router(config.clone(), directions, store)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer);

    // Start server
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .expect("Failed to bind server port");

    tracing::info!("Server running on http://localhost:{}", config.port);
    tracing::info!("Swagger UI: http://localhost:{}/swagger-ui", config.port);

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
