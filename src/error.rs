//! Unified error handling.
//!
//! Every handler returns `Result<T, AppError>`. Errors render as
//! `{ "error": "<message>" }` with a coarse status code; server-side failures
//! are logged and their details are not exposed.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use validator::ValidationErrors;

use crate::auth::AuthError;
use crate::db::RepositoryError;
use crate::domain::aggregates::{CartError, OrderError, ProductError, RoleError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    pub fn not_found(what: &str) -> Self {
        Self::NotFound(format!("{what} not found"))
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::Conflict(_) | RepositoryError::ForeignKey(_)) => StatusCode::BAD_REQUEST,
            Self::Database(RepositoryError::Database(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::MissingToken | AuthError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
                AuthError::Forbidden => StatusCode::FORBIDDEN,
                AuthError::WeakPassword(_) => StatusCode::BAD_REQUEST,
                AuthError::SimpleAdminDisabled => StatusCode::NOT_FOUND,
                AuthError::PasswordHash(_) | AuthError::TokenSigning(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Database(RepositoryError::Conflict(_)) => "Resource already exists".to_string(),
            Self::Database(RepositoryError::ForeignKey(_)) => "Invalid reference".to_string(),
            Self::Database(RepositoryError::Database(_)) => "Internal server error".to_string(),
            Self::Auth(AuthError::PasswordHash(_) | AuthError::TokenSigning(_)) => "Internal server error".to_string(),
            Self::Auth(err) => err.to_string(),
            Self::NotFound(msg) | Self::Forbidden(msg) | Self::BadRequest(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.client_message() }))).into_response()
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        Self::BadRequest(first_validation_message(&errors))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<OrderError> for AppError {
    fn from(e: OrderError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl From<CartError> for AppError {
    fn from(e: CartError) -> Self {
        Self::NotFound(e.to_string())
    }
}

impl From<ProductError> for AppError {
    fn from(e: ProductError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl From<RoleError> for AppError {
    fn from(e: RoleError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

/// Deterministic (field-name ordered) first failure, as `field: message`.
fn first_validation_message(errors: &ValidationErrors) -> String {
    let fields = errors.field_errors();
    let mut names: Vec<&&str> = fields.keys().collect();
    names.sort();
    names
        .first()
        .and_then(|name| {
            let err = fields.get(*name)?.first()?;
            let msg = err.message.as_ref().map_or_else(|| err.code.to_string(), ToString::to_string);
            Some(format!("{name}: {msg}"))
        })
        .unwrap_or_else(|| "Invalid request".to_string())
}

pub type Result<T> = std::result::Result<T, AppError>;
