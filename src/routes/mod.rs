//! HTTP surface: one router per resource, nested under `/api`.

pub mod admin;
pub mod auth;
pub mod cart;
pub mod categories;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod users;

use axum::{
    extract::State,
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::simple_admin::ADMIN_PASSWORD_HEADER;
use crate::auth::TOKEN_HEADER;
use crate::config::ConfigError;
use crate::state::AppState;

pub const SERVICE_NAME: &str = "storefront-api";

pub fn router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(ready))
        .nest("/api/auth", auth::routes())
        .nest("/api/products", products::routes())
        .nest("/api/categories", categories::routes())
        .nest("/api/orders", orders::routes())
        .nest("/api/reviews", reviews::routes())
        .nest("/api/cart", cart::routes())
        .nest("/api/users", users::routes())
        .nest("/api/admin", admin::routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Permissive without an origin. With one, credentials are allowed so the
/// session cookie travels, which rules out wildcard headers and methods.
pub fn cors_layer(origin: Option<&str>) -> Result<CorsLayer, ConfigError> {
    let Some(origin) = origin else {
        return Ok(CorsLayer::permissive());
    };
    let origin = HeaderValue::from_str(origin).map_err(|e| ConfigError::InvalidEnvVar("CORS_ORIGIN".into(), e.to_string()))?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, HeaderName::from_static(ADMIN_PASSWORD_HEADER)])
        .expose_headers([HeaderName::from_static(TOKEN_HEADER)]))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": SERVICE_NAME }))
}

async fn ready(State(s): State<AppState>) -> (StatusCode, Json<Value>) {
    match sqlx::query("SELECT 1").execute(&s.db).await {
        Ok(_) => (StatusCode::OK, Json(json!({ "status": "ready" }))),
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "status": "unavailable" })))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_rejects_bad_origin() {
        assert!(cors_layer(Some("http://localhost:3000")).is_ok());
        assert!(cors_layer(Some("bad\norigin")).is_err());
        assert!(cors_layer(None).is_ok());
    }
}
