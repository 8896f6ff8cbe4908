pub mod auth;
mod error;
mod games;
mod oauth;
mod report;
mod validation;

pub use error::{ApiError, ErrorCode};

use axum::{
    http::{header, HeaderValue, Method},
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Login flow and current-user lookups
    let auth_routes = Router::new()
        .route("/google/login", get(oauth::login))
        .route("/google/callback", get(oauth::callback))
        .route("/google/logout", post(auth::logout))
        .route("/me", get(auth::me));

    // Record operations; each handler authenticates via the User extractor
    let api_routes = Router::new()
        .route("/sessions", get(games::list_sessions))
        .route("/sessions", post(games::create_session))
        .route("/sessions/summary", get(games::year_summary))
        .route("/sessions/:id", get(games::get_session))
        .route("/sessions/:id", put(games::update_session))
        .route("/sessions/:id", delete(games::delete_session))
        .route("/report", post(report::report_problem));

    let mut router = Router::new()
        .route("/health", get(health_check))
        .nest("/auth", auth_routes)
        .nest("/api", api_routes);

    // Credentialed CORS for a frontend on a different origin
    if let Some(origin) = state
        .config
        .server
        .allowed_origin
        .as_deref()
        .and_then(|o| o.parse::<HeaderValue>().ok())
    {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
                .allow_credentials(true),
        );
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
