//! Users service routes

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, OriginalUri, State},
    http::{HeaderValue, Method, StatusCode, header},
    middleware,
    response::IntoResponse,
    routing::get,
};
use chrono::{SecondsFormat, Utc};
use serde_json::json;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    set_header::SetResponseHeaderLayer,
};
use tracing::{info, warn};

use crate::{
    config::ServerConfig,
    middleware::{log_requests, rate_limit},
    rate_limiter::{RateLimiter, RateLimiterConfig},
    state::AppState,
};

pub mod users;

const AVAILABLE_ENDPOINTS: [&str; 8] = [
    "GET /",
    "GET /api/health",
    "GET /api/users",
    "POST /api/users",
    "GET /api/users/:id",
    "PUT /api/users/:id",
    "DELETE /api/users/:id",
    "GET /api/users/estadisticas/resumen",
];

/// Create the router for the users service
pub fn create_router(state: AppState, config: &ServerConfig) -> Router {
    let limiter = RateLimiter::new(RateLimiterConfig {
        max_requests: config.rate_limit_max,
        window: config.rate_limit_window(),
    });
    info!(
        "Rate limiting to {} requests per {:?} per client",
        limiter.config().max_requests,
        limiter.config().window
    );

    Router::new()
        .route("/", get(service_info).fallback(not_found))
        .route("/api/health", get(health_check).fallback(not_found))
        .nest("/api/users", users::router())
        .fallback(not_found)
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.body_limit_bytes))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(middleware::from_fn_with_state(limiter, rate_limit))
        .layer(cors_layer(&config.allowed_origins))
        .layer(middleware::from_fn(log_requests))
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Service descriptor
pub async fn service_info() -> impl IntoResponse {
    Json(json!({
        "message": "API de Gestión de Usuarios",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "/api/health",
            "users": {
                "getAll": "GET /api/users",
                "create": "POST /api/users",
                "getById": "GET /api/users/:id",
                "update": "PUT /api/users/:id",
                "delete": "DELETE /api/users/:id",
                "stats": "GET /api/users/estadisticas/resumen"
            }
        }
    }))
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let connected = state.users.ping().await;

    Json(json!({
        "success": true,
        "message": "API funcionando correctamente",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        "database": if connected { "Conectada" } else { "Desconectada" },
    }))
}

/// Fallback for unmatched routes and for unsupported methods on known paths
pub async fn not_found(method: Method, OriginalUri(uri): OriginalUri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "message": format!("Ruta {} {} no encontrada", method, uri),
            "availableEndpoints": AVAILABLE_ENDPOINTS,
        })),
    )
}

#[cfg(test)]
pub(crate) mod testing {
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode, header},
    };
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::{
        config::ServerConfig, repositories::memory::InMemoryUserRepository, state::AppState,
    };

    pub fn test_config() -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            environment: "test".to_string(),
            allowed_origins: vec!["http://localhost:5500".to_string()],
            rate_limit_max: 1_000,
            rate_limit_window_secs: 900,
            body_limit_bytes: 64 * 1024,
        }
    }

    pub fn app_with(repo: Arc<InMemoryUserRepository>, config: &ServerConfig) -> Router {
        super::create_router(AppState::new(repo), config)
    }

    pub fn app(repo: Arc<InMemoryUserRepository>) -> Router {
        app_with(repo, &test_config())
    }

    pub async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }
}
