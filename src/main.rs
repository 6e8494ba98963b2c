//! Mind Goal Backend
//!
//! A REST backend for the Mind Goal self-reflection platform: activity
//! record storage, score aggregation, the public leaderboard, and the AI
//! dream-roadmap client.

mod ai;
mod api;
mod auth;
mod config;
mod db;
mod errors;
mod leaderboard;
mod models;
mod scoring;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ai::AiClient;
use config::Config;
use db::{DataStore, MemoryStore, SqliteStore};
use leaderboard::Leaderboard;
use scoring::ScoreCalculator;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DataStore>,
    pub calculator: Arc<ScoreCalculator>,
    pub leaderboard: Arc<Leaderboard>,
    pub ai: Arc<AiClient>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn DataStore>, ai: AiClient, config: Config) -> Self {
        Self {
            calculator: Arc::new(ScoreCalculator::new(store.clone())),
            leaderboard: Arc::new(Leaderboard::new(store.clone())),
            store,
            ai: Arc::new(ai),
            config: Arc::new(config),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Mind Goal Backend");
    tracing::info!("Bind address: {}", config.bind_addr);

    // Warn about degraded configurations
    if config.api_psk.is_none() {
        tracing::warn!("No API PSK configured (MINDGOAL_API_PSK). Authentication is disabled!");
    }
    if config.openai_api_key.is_none() {
        tracing::warn!(
            "No AI API key configured (MINDGOAL_OPENAI_API_KEY). Roadmap generation is disabled."
        );
    }

    // Select the data store once at startup
    let store: Arc<dyn DataStore> = match &config.db_path {
        Some(db_path) => {
            tracing::info!("Database path: {:?}", db_path);
            let pool = db::init_database(db_path).await?;
            Arc::new(SqliteStore::new(pool))
        }
        None => {
            tracing::warn!(
                "No database path configured (MINDGOAL_DB_PATH). Running in demo mode; data will not persist."
            );
            Arc::new(MemoryStore::new())
        }
    };

    let ai = AiClient::new(config.openai_api_key.clone(), config.openai_base_url.clone());

    let state = AppState::new(store, ai, config.clone());

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Clone PSK for the auth layer
    let psk = state.config.api_psk.clone();

    // API routes
    let api_routes = Router::new()
        // Profiles
        .route("/profiles", get(api::list_profiles))
        .route("/profiles/{id}", put(api::upsert_profile))
        .route("/profiles/{id}", get(api::get_profile))
        // Activity records
        .route("/users/{id}/responses", post(api::add_text_response))
        .route("/users/{id}/timeline", post(api::add_timeline_note))
        .route("/users/{id}/letters", post(api::add_letter))
        .route("/users/{id}/matching", post(api::add_matching_attempt))
        .route("/users/{id}/emotions", post(api::add_emotion_log))
        .route("/users/{id}/meditation", put(api::upsert_meditation_session))
        .route("/users/{id}/anger", put(api::upsert_anger_session))
        .route(
            "/users/{id}/communication",
            put(api::upsert_communication_session),
        )
        .route("/users/{id}/limits", put(api::upsert_limit_session))
        .route("/users/{id}/problems", put(api::upsert_problem_session))
        .route("/users/{id}/candy", put(api::upsert_candy_session))
        .route("/users/{id}/activities", get(api::get_activity_bundle))
        // Score
        .route("/users/{id}/score", post(api::recompute_score))
        .route("/users/{id}/score", get(api::get_score))
        // Leaderboard
        .route("/leaderboard", get(api::list_leaderboard))
        .route("/leaderboard/recompute", post(api::recompute_leaderboard))
        .route("/leaderboard/{id}/position", get(api::get_position))
        // Dreams
        .route("/users/{id}/roadmap", post(api::generate_roadmap))
        .route("/dreams/suggestions", get(api::dream_suggestions))
        // Apply PSK auth middleware
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(psk.clone(), req, next)
        }));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
