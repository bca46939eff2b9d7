pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod security;
pub mod state;

use std::str::FromStr;
use std::sync::Arc;

use axum::Router;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use sqlx::ConnectOptions;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::state::AppState;

/// Build a fully configured Router + shared state.
pub async fn build_app(config: Config) -> Result<(Router, Arc<AppState>), sqlx::Error> {
    let options = SqliteConnectOptions::from_str(&config.database_url)?;
    let options = if config.debug {
        options
    } else {
        options.disable_statement_logging()
    };

    // An in-memory database lives and dies with its connection.
    let mut pool_options = SqlitePoolOptions::new().max_connections(config.max_connections);
    if config.database_url.contains(":memory:") {
        pool_options = pool_options
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }
    let pool = pool_options.connect_with(options).await?;

    db::init_db(&pool).await?;
    info!(database = %config.database_url, "database ready");

    let cors = cors_layer(&config.allowed_origins);
    let state = Arc::new(AppState { db: pool, config });

    let app = Router::new()
        .route("/health", get(routes::health))
        .route("/auth/login", post(routes::login))
        .route("/users", get(routes::list_users).post(routes::create_user))
        .route(
            "/users/{id}",
            get(routes::get_user)
                .put(routes::update_user)
                .delete(routes::delete_user),
        )
        .route("/users/{id}/puzzles", get(routes::user_puzzles))
        .route(
            "/puzzles",
            get(routes::list_puzzles).post(routes::create_puzzle),
        )
        .route(
            "/puzzles/{id}",
            get(routes::get_puzzle)
                .put(routes::update_puzzle)
                .delete(routes::delete_puzzle),
        )
        .route("/puzzles/{id}/solution", get(routes::get_solution))
        .route(
            "/progress/{puzzle_id}",
            get(routes::get_progress)
                .post(routes::create_progress)
                .put(routes::update_progress)
                .delete(routes::delete_progress),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    Ok((app, state))
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}
