//! KnowledgeHub API
//!
//! A knowledge management portal where consultants upload, version,
//! review, rate and discuss documents.
//!
//! ## Features
//!
//! - **Document lifecycle**: upload with near-duplicate detection,
//!   append-only version history, role-gated review transitions
//! - **Compliance gate**: EU personal-data uploads are auto-rejected
//! - **Gamification**: points, badges and a leaderboard
//! - **Notifications**: review queue, approvals and badge awards

mod audit;
mod compliance;
mod config;
mod db;
mod gamification;
mod handlers;
mod lifecycle;
mod models;
mod notify;
mod similarity;
mod store;
mod users;
mod validation;

use audit::AuditSink;
use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use gamification::GamificationEngine;
use handlers::AppState;
use lifecycle::LifecycleManager;
use notify::NotificationSink;
use store::DocumentStore;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use users::UserDirectory;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "knowledgehub=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = config::Config::from_env()?;
    tracing::info!("Starting KnowledgeHub API");
    tracing::info!("Environment: {:?}", config.environment);

    // Create database pool
    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database connected");

    // Run migrations
    tracing::info!("Running database migrations...");
    db::run_migrations(&pool).await?;

    // Construct services once and inject them everywhere they are needed
    let store = DocumentStore::new(pool.clone());
    let users = UserDirectory::new(pool.clone());
    let engine = GamificationEngine::new(pool.clone());
    let notifications = NotificationSink::new(pool.clone());
    let audit = AuditSink::new(pool.clone());
    let lifecycle = LifecycleManager::new(
        store.clone(),
        users.clone(),
        engine.clone(),
        notifications.clone(),
        audit.clone(),
    );

    let state = AppState {
        pool,
        store,
        users,
        engine,
        notifications,
        audit,
        lifecycle,
        session_expiry_hours: config.session_expiry_hours,
        is_production: config.is_production(),
    };

    // Build CORS layer
    let cors = if config.is_production() {
        CorsLayer::new()
            .allow_origin(
                config
                    .cors_origins
                    .iter()
                    .filter_map(|o| o.parse().ok())
                    .collect::<Vec<_>>(),
            )
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::permissive()
    };

    // Build API routes
    let api_routes = Router::new()
        // Document lifecycle
        .route("/documents", post(handlers::upload_document))
        .route("/documents", get(handlers::list_documents))
        .route("/documents/check-title", get(handlers::check_title))
        .route("/documents/:id", get(handlers::get_document))
        .route("/documents/:id", delete(handlers::delete_document))
        .route("/documents/:id/review", post(handlers::review_document))
        .route("/documents/:id/flag", post(handlers::flag_document))
        // Engagement
        .route("/documents/:id/rate", post(handlers::rate_document))
        .route("/documents/:id/comments", post(handlers::comment_document))
        .route(
            "/documents/:id/comments/:comment_id",
            delete(handlers::delete_comment),
        )
        .route("/documents/:id/like", post(handlers::like_document))
        // Users
        .route("/users", post(handlers::create_user))
        .route("/users/:id", get(handlers::get_user))
        .route("/users/:id/onboarding", put(handlers::update_onboarding))
        .route(
            "/users/:id/notifications",
            get(handlers::list_notifications),
        )
        // Notifications
        .route(
            "/notifications/:id/read",
            put(handlers::mark_notification_read),
        )
        // Gamification
        .route("/gamification/leaderboard", get(handlers::get_leaderboard))
        .route(
            "/gamification/users/:id/score",
            get(handlers::get_score_breakdown),
        )
        // Authentication
        .route("/auth/login", post(handlers::login))
        .route("/auth/logout", post(handlers::logout))
        .route("/auth/me", get(handlers::get_current_user))
        // Admin
        .route("/admin/stats", get(handlers::get_dashboard_stats));

    // Build main router
    let app = Router::new()
        .nest("/api", api_routes)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            handlers::middleware::security_headers,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(config.max_body_size))
        .layer(cors)
        .with_state(state);

    // Start server
    let addr = config.server_addr();
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
