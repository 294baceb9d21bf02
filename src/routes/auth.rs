//! `/api/auth`: register, login, logout, current user.

use axum::{
    extract::State,
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::auth::{self, AuthUser, TOKEN_HEADER};
use crate::db::users::{User, UserRepository};
use crate::db::RepositoryError;
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::Email;
use crate::error::{AppError, Result};
use crate::extract::ValidatedJson;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

async fn register(State(s): State<AppState>, ValidatedJson(r): ValidatedJson<RegisterRequest>) -> Result<Response> {
    let email = Email::parse(&r.email).map_err(|e| AppError::BadRequest(e.to_string()))?;
    auth::validate_password(&r.password)?;
    let name = r.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("name: Name is required".into()));
    }
    let password_hash = auth::hash_password(&r.password)?;

    let user = UserRepository::new(&s.db).create(&email, &password_hash, name).await.map_err(|e| match e {
        RepositoryError::Conflict(_) => AppError::BadRequest("User already exists".into()),
        other => other.into(),
    })?;

    tracing::info!(user_id = %user.id, "user registered");
    s.events.publish(DomainEvent::UserRegistered { user_id: user.id }).await;
    session_response(&s, StatusCode::CREATED, user)
}

async fn login(State(s): State<AppState>, ValidatedJson(r): ValidatedJson<LoginRequest>) -> Result<Response> {
    let email = Email::parse(&r.email).map_err(|_| auth::reject_unknown_user(&r.password))?;
    let Some((user, password_hash)) = UserRepository::new(&s.db).get_with_password_hash(&email).await? else {
        return Err(auth::reject_unknown_user(&r.password).into());
    };
    auth::verify_password(&r.password, &password_hash)?;

    tracing::info!(user_id = %user.id, "user logged in");
    session_response(&s, StatusCode::OK, user)
}

async fn logout(State(s): State<AppState>) -> impl IntoResponse {
    ([(header::SET_COOKIE, s.tokens.clear_cookie().to_string())], Json(json!({ "message": "Logged out" })))
}

async fn me(State(s): State<AppState>, user: AuthUser) -> Result<Json<User>> {
    UserRepository::new(&s.db).get(user.id()).await?.map(Json).ok_or_else(|| AppError::not_found("User"))
}

/// Token goes out three ways: httpOnly cookie, `X-Auth-Token` header and the body.
fn session_response(s: &AppState, status: StatusCode, user: User) -> Result<Response> {
    let token = s.tokens.issue(user.id, &user.email, user.role)?;
    let headers = [
        (header::SET_COOKIE, s.tokens.session_cookie(&token).to_string()),
        (HeaderName::from_static(TOKEN_HEADER), token.clone()),
    ];
    Ok((status, headers, Json(AuthResponse { user, token })).into_response())
}
