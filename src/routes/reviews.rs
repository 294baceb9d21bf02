//! `/api/reviews`

use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::db::products::ProductRepository;
use crate::db::reviews::{Review, ReviewRepository};
use crate::db::RepositoryError;
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::Rating;
use crate::error::{AppError, Result};
use crate::extract::{ApiPath, ValidatedJson};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_review))
        .route("/product/:product_id", get(list_reviews))
        .route("/:id", delete(delete_review))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,
    #[validate(length(max = 2000))]
    pub comment: Option<String>,
}

async fn list_reviews(State(s): State<AppState>, ApiPath(product_id): ApiPath<Uuid>) -> Result<Json<Vec<Review>>> {
    Ok(Json(ReviewRepository::new(&s.db).list_for_product(product_id).await?))
}

async fn create_review(
    State(s): State<AppState>,
    user: AuthUser,
    ValidatedJson(r): ValidatedJson<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Review>)> {
    let rating = Rating::try_from(r.rating).map_err(|e| AppError::BadRequest(e.to_string()))?;
    if !ProductRepository::new(&s.db).exists(r.product_id).await? {
        return Err(AppError::not_found("Product"));
    }
    let comment = r.comment.as_deref().map(str::trim).filter(|c| !c.is_empty());

    let review = ReviewRepository::new(&s.db)
        .create(user.id(), r.product_id, rating, comment)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => AppError::BadRequest("You have already reviewed this product".into()),
            RepositoryError::ForeignKey(_) => AppError::not_found("Product"),
            other => other.into(),
        })?;

    tracing::info!(review_id = %review.id, product_id = %r.product_id, user_id = %user.id(), "review posted");
    s.events
        .publish(DomainEvent::ReviewPosted { review_id: review.id, product_id: r.product_id, rating: review.rating })
        .await;
    Ok((StatusCode::CREATED, Json(review)))
}

async fn delete_review(State(s): State<AppState>, user: AuthUser, ApiPath(id): ApiPath<Uuid>) -> Result<Json<Value>> {
    let repo = ReviewRepository::new(&s.db);
    let review = repo.get(id).await?.ok_or_else(|| AppError::not_found("Review"))?;
    if !user.can_access(review.user_id) {
        return Err(AppError::Forbidden("You can only delete your own reviews".into()));
    }
    repo.delete(id).await?;
    tracing::info!(review_id = %id, user_id = %user.id(), "review deleted");
    Ok(Json(json!({ "message": "Review deleted" })))
}
