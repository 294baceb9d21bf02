//! `/api/categories`

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use crate::auth::AdminUser;
use crate::db::categories::{Category, CategoryInput, CategoryRepository};
use crate::db::RepositoryError;
use crate::domain::value_objects::Slug;
use crate::error::{AppError, Result};
use crate::extract::{ApiPath, ValidatedJson};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    // One segment name: GET reads it as a slug, PUT/DELETE as an id.
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route("/:slug", get(get_category).put(update_category).delete(delete_category))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub slug: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

impl TryFrom<CategoryRequest> for CategoryInput {
    type Error = AppError;

    fn try_from(r: CategoryRequest) -> Result<Self> {
        let slug = Slug::from_name(r.slug.as_deref().unwrap_or(&r.name))
            .ok_or_else(|| AppError::BadRequest("slug: Slug must contain letters or digits".into()))?;
        Ok(Self { name: r.name.trim().to_string(), slug, description: r.description, image_url: r.image_url })
    }
}

async fn list_categories(State(s): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(CategoryRepository::new(&s.db).list().await?))
}

async fn get_category(State(s): State<AppState>, ApiPath(slug): ApiPath<String>) -> Result<Json<Category>> {
    CategoryRepository::new(&s.db).get_by_slug(&slug).await?.map(Json).ok_or_else(|| AppError::not_found("Category"))
}

async fn create_category(
    State(s): State<AppState>,
    admin: AdminUser,
    ValidatedJson(r): ValidatedJson<CategoryRequest>,
) -> Result<(StatusCode, Json<Category>)> {
    let input = CategoryInput::try_from(r)?;
    let category = CategoryRepository::new(&s.db).create(&input).await.map_err(duplicate_slug)?;
    tracing::info!(category_id = %category.id, actor = admin.actor(), "category created");
    Ok((StatusCode::CREATED, Json(category)))
}

async fn update_category(
    State(s): State<AppState>,
    admin: AdminUser,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(r): ValidatedJson<CategoryRequest>,
) -> Result<Json<Category>> {
    let input = CategoryInput::try_from(r)?;
    let category = CategoryRepository::new(&s.db)
        .update(id, &input)
        .await
        .map_err(duplicate_slug)?
        .ok_or_else(|| AppError::not_found("Category"))?;
    tracing::info!(category_id = %id, actor = admin.actor(), "category updated");
    Ok(Json(category))
}

async fn delete_category(State(s): State<AppState>, admin: AdminUser, ApiPath(id): ApiPath<Uuid>) -> Result<Json<Value>> {
    if !CategoryRepository::new(&s.db).delete(id).await? {
        return Err(AppError::not_found("Category"));
    }
    tracing::info!(category_id = %id, actor = admin.actor(), "category deleted");
    Ok(Json(json!({ "message": "Category deleted" })))
}

fn duplicate_slug(e: RepositoryError) -> AppError {
    match e {
        RepositoryError::Conflict(_) => AppError::BadRequest("A category with this slug already exists".into()),
        other => other.into(),
    }
}
