//! `/api/users`: the caller's profile, password and wishlist.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{self, AuthError, AuthUser};
use crate::db::products::ProductSummary;
use crate::db::users::{User, UserRepository};
use crate::db::wishlist::WishlistRepository;
use crate::db::RepositoryError;
use crate::domain::value_objects::Email;
use crate::error::{AppError, Result};
use crate::extract::{ApiPath, ValidatedJson};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route("/password", put(change_password))
        .route("/wishlist", get(list_wishlist))
        .route("/wishlist/:product_id", post(add_to_wishlist).delete(remove_from_wishlist))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100, message = "Name cannot be empty"))]
    pub name: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
}

impl UpdateProfileRequest {
    /// Trimmed name; a present but blank name is rejected rather than ignored.
    fn name(&self) -> Result<Option<&str>> {
        match self.name.as_deref().map(str::trim) {
            Some("") => Err(AppError::BadRequest("name: Name cannot be empty".into())),
            other => Ok(other),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,
}

async fn get_profile(State(s): State<AppState>, user: AuthUser) -> Result<Json<User>> {
    UserRepository::new(&s.db).get(user.id()).await?.map(Json).ok_or_else(|| AppError::not_found("User"))
}

async fn update_profile(
    State(s): State<AppState>,
    user: AuthUser,
    ValidatedJson(r): ValidatedJson<UpdateProfileRequest>,
) -> Result<Json<User>> {
    let name = r.name()?;
    let email = r.email.as_deref().map(Email::parse).transpose().map_err(|e| AppError::BadRequest(e.to_string()))?;

    let updated = UserRepository::new(&s.db)
        .update_profile(user.id(), name, email.as_ref())
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => AppError::BadRequest("Email already in use".into()),
            other => other.into(),
        })?
        .ok_or_else(|| AppError::not_found("User"))?;
    tracing::info!(user_id = %user.id(), "profile updated");
    Ok(Json(updated))
}

async fn change_password(
    State(s): State<AppState>,
    user: AuthUser,
    ValidatedJson(r): ValidatedJson<ChangePasswordRequest>,
) -> Result<Json<Value>> {
    let repo = UserRepository::new(&s.db);
    let current_hash = repo.password_hash(user.id()).await?.ok_or_else(|| AppError::not_found("User"))?;
    auth::verify_password(&r.current_password, &current_hash).map_err(|_| AuthError::InvalidCredentials)?;
    auth::validate_password(&r.new_password)?;

    let new_hash = auth::hash_password(&r.new_password)?;
    repo.set_password_hash(user.id(), &new_hash).await?;
    tracing::info!(user_id = %user.id(), "password changed");
    Ok(Json(json!({ "message": "Password updated" })))
}

async fn list_wishlist(State(s): State<AppState>, user: AuthUser) -> Result<Json<Vec<ProductSummary>>> {
    Ok(Json(WishlistRepository::new(&s.db).list(user.id()).await?))
}

async fn add_to_wishlist(
    State(s): State<AppState>,
    user: AuthUser,
    ApiPath(product_id): ApiPath<Uuid>,
) -> Result<(StatusCode, Json<Vec<ProductSummary>>)> {
    let repo = WishlistRepository::new(&s.db);
    repo.add(user.id(), product_id).await.map_err(|e| match e {
        RepositoryError::ForeignKey(_) => AppError::not_found("Product"),
        other => other.into(),
    })?;
    Ok((StatusCode::CREATED, Json(repo.list(user.id()).await?)))
}

async fn remove_from_wishlist(
    State(s): State<AppState>,
    user: AuthUser,
    ApiPath(product_id): ApiPath<Uuid>,
) -> Result<Json<Vec<ProductSummary>>> {
    let repo = WishlistRepository::new(&s.db);
    if !repo.remove(user.id(), product_id).await? {
        return Err(AppError::not_found("Wishlist item"));
    }
    Ok(Json(repo.list(user.id()).await?))
}
