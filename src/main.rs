use axum::{
    routing::{delete, get, patch, post},
    Router,
};
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use credit_bureau_api::config::Config;
use credit_bureau_api::db::Database;
use credit_bureau_api::handlers::{self, AppState};

/// Main entry point for the application.
///
/// Initializes logging, configuration, the database pool and caches, then
/// starts the Axum server with the bureau routes behind rate limiting and
/// body-size middleware.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "credit_bureau_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    // Initialize database connection pool
    let db = Database::new(&config.database_url, config.max_db_connections).await?;
    tracing::info!("Database connection pool established");

    // Consumer -> profile identity cache (1 hour TTL). The mapping never
    // changes once the profile exists, so the TTL only bounds memory.
    let profile_id_cache = Cache::builder()
        .time_to_live(Duration::from_secs(3600))
        .max_capacity(100_000)
        .build();
    tracing::info!("Profile identity cache initialized");

    // Build application state
    let app_state = Arc::new(AppState {
        db: db.pool.clone(),
        config: config.clone(),
        profile_id_cache,
    });

    // Configure rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .unwrap(),
    );

    // Build protected routes with security layers
    let protected_routes = Router::new()
        // Profiles
        .route("/api/v1/profiles", post(handlers::create_profile))
        .route("/api/v1/profiles/me", get(handlers::get_own_profile))
        .route(
            "/api/v1/profiles/:id",
            get(handlers::get_profile).patch(handlers::admin_update_profile),
        )
        .route("/api/v1/profiles/:id/freeze", post(handlers::freeze_profile))
        .route(
            "/api/v1/profiles/:id/unfreeze",
            post(handlers::unfreeze_profile),
        )
        .route(
            "/api/v1/profiles/:id/fraud-alert",
            post(handlers::set_fraud_alert),
        )
        .route(
            "/api/v1/profiles/:id/recalculate",
            post(handlers::recalculate_profile),
        )
        .route("/api/v1/profiles/:id/score", get(handlers::preview_score))
        .route(
            "/api/v1/profiles/:id/collections",
            get(handlers::list_collections),
        )
        // Accounts
        .route("/api/v1/accounts", post(handlers::create_account))
        .route(
            "/api/v1/accounts/:id",
            patch(handlers::update_account).delete(handlers::delete_account),
        )
        .route(
            "/api/v1/accounts/:id/payments",
            post(handlers::report_payment),
        )
        // Inquiries
        .route("/api/v1/inquiries", post(handlers::create_inquiry))
        .route("/api/v1/inquiries/:id", delete(handlers::delete_inquiry))
        // Public records
        .route(
            "/api/v1/public-records",
            post(handlers::create_public_record),
        )
        .route(
            "/api/v1/public-records/:id",
            patch(handlers::update_public_record),
        )
        // Collections
        .route("/api/v1/collections", post(handlers::create_collection))
        // Disputes
        .route("/api/v1/disputes", post(handlers::create_dispute))
        .route("/api/v1/disputes/:id", patch(handlers::update_dispute))
        .route(
            "/api/v1/disputes/:id/respond",
            post(handlers::respond_to_dispute),
        )
        .route(
            "/api/v1/disputes/:id/cancel",
            post(handlers::cancel_dispute),
        )
        .route(
            "/api/v1/disputes/:id/resolve",
            post(handlers::resolve_dispute),
        )
        // Reports
        .route("/api/v1/reports", post(handlers::generate_report))
        .route("/api/v1/reports/request", post(handlers::request_report))
        .route(
            "/api/v1/reports/token/:token",
            get(handlers::fetch_report_by_token),
        )
        .layer(
            ServiceBuilder::new()
                // Request size limit: 2MB max payload
                .layer(RequestBodyLimitLayer::new(2 * 1024 * 1024))
                // Rate limiting: 10 req/sec per IP, burst of 20
                .layer(GovernorLayer {
                    config: governor_conf,
                }),
        );

    // Build final app with health check (bypasses rate limiting)
    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
