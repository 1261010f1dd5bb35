use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method, StatusCode,
    },
    middleware,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::middleware::{make_span_with_request_id, request_id_middleware};

pub mod auth;
pub mod extract;
pub mod perfumes;
pub mod profiles;
pub mod questionnaire;
pub mod recommendations;
pub mod state;
pub mod users;

pub use state::AppState;

/// Creates the application router with all routes and layers
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .nest("/api", api_routes())
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .with_state(state)
}

/// API routes under /api
fn api_routes() -> Router<AppState> {
    Router::new()
        // Accounts
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/users", get(users::list))
        .route(
            "/users/:id",
            get(users::get).put(users::update).delete(users::delete),
        )
        // Profiles
        .route(
            "/users/:id/profile",
            get(profiles::get).put(profiles::upsert).delete(profiles::delete),
        )
        .route(
            "/users/:id/profile/from-questionnaire",
            post(profiles::from_questionnaire),
        )
        // Questionnaire
        .route("/questionnaire/questions", get(questionnaire::questions))
        .route(
            "/users/:id/questionnaire",
            get(questionnaire::list).post(questionnaire::submit),
        )
        .route(
            "/users/:id/questionnaire/:response_id",
            delete(questionnaire::delete),
        )
        // Catalog
        .route("/perfumes", get(perfumes::list).post(perfumes::create))
        .route(
            "/perfumes/:id",
            get(perfumes::get).put(perfumes::update).delete(perfumes::delete),
        )
        // Recommendations
        .route(
            "/users/:id/recommendations",
            get(recommendations::history).post(recommendations::generate),
        )
        .route(
            "/users/:id/daily-recommendation",
            post(recommendations::daily),
        )
        .route(
            "/recommendations/latest/:user_id",
            get(recommendations::latest),
        )
        .route(
            "/recommendations/:id",
            get(recommendations::get).delete(recommendations::delete),
        )
        .route(
            "/recommendations/:id/feedback",
            post(recommendations::feedback),
        )
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins()
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    use super::*;
    use crate::db::MemoryStore;

    fn app(config: Config) -> Router {
        create_router(AppState::new(Arc::new(MemoryStore::new()), None, config))
    }

    #[tokio::test]
    async fn test_request_id_is_echoed() {
        let response = app(Config::default())
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("x-request-id", "req-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-request-id"], "req-42");
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let response = app(Config::default())
            .oneshot(Request::builder().uri("/api/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cors_allows_configured_origin() {
        let config = Config {
            cors_origins: "http://localhost:5173".to_string(),
            ..Config::default()
        };
        let response = app(config)
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/perfumes")
                    .header("origin", "http://localhost:5173")
                    .header("access-control-request-method", "GET")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "http://localhost:5173"
        );
    }
}
