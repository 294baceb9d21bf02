//! `/api/cart`: the caller's server-side cart. Every mutation answers with the
//! reloaded cart so clients never compute totals themselves.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::db::carts::CartRepository;
use crate::db::RepositoryError;
use crate::domain::aggregates::{Cart, CartItem};
use crate::domain::value_objects::Money;
use crate::error::{AppError, Result};
use crate::extract::{ApiPath, ValidatedJson};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_cart).delete(clear_cart))
        .route("/items", post(add_item))
        .route("/items/:item_id", put(update_item).delete(remove_item))
        .route("/merge", post(merge_cart))
}

fn default_quantity() -> i64 {
    1
}

#[derive(Debug, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: Uuid,
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1, max = 1000, message = "Quantity must be between 1 and 1000"))]
    pub quantity: i64,
    pub size: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateItemRequest {
    #[validate(range(min = 0, max = 1000, message = "Quantity must be between 0 and 1000"))]
    pub quantity: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MergeCartRequest {
    #[validate(length(max = 100, message = "Too many items"))]
    pub items: Vec<AddItemRequest>,
}

impl MergeCartRequest {
    /// Folds the client lines with the cart merge rule so duplicates collapse
    /// before touching the database. Lines with a non-positive quantity are dropped
    /// and merged lines never exceed the per-line order limit.
    fn into_cart(self, user_id: Uuid) -> Cart {
        let lines = self.items.into_iter().map(|i| CartItem {
            id: Uuid::nil(),
            product_id: i.product_id,
            name: String::new(),
            image_url: None,
            size: i.size,
            color: i.color,
            quantity: u32::try_from(i.quantity).unwrap_or(0),
            unit_price: Money::ZERO,
            stock: 0,
        });
        Cart::with_items(user_id, lines)
    }
}

async fn get_cart(State(s): State<AppState>, user: AuthUser) -> Result<Json<Cart>> {
    Ok(Json(CartRepository::new(&s.db).load(user.id()).await?))
}

async fn add_item(State(s): State<AppState>, user: AuthUser, ValidatedJson(r): ValidatedJson<AddItemRequest>) -> Result<(StatusCode, Json<Cart>)> {
    let repo = CartRepository::new(&s.db);
    let quantity = u32::try_from(r.quantity).map_err(|_| AppError::BadRequest("Invalid quantity".into()))?;
    repo.add(user.id(), r.product_id, quantity, r.size.as_deref(), r.color.as_deref())
        .await
        .map_err(|e| match e {
            RepositoryError::ForeignKey(_) => AppError::not_found("Product"),
            other => other.into(),
        })?;
    tracing::debug!(user_id = %user.id(), product_id = %r.product_id, quantity, "cart item added");
    Ok((StatusCode::CREATED, Json(repo.load(user.id()).await?)))
}

async fn update_item(
    State(s): State<AppState>,
    user: AuthUser,
    ApiPath(item_id): ApiPath<Uuid>,
    ValidatedJson(r): ValidatedJson<UpdateItemRequest>,
) -> Result<Json<Cart>> {
    let repo = CartRepository::new(&s.db);
    let quantity = u32::try_from(r.quantity).map_err(|_| AppError::BadRequest("Invalid quantity".into()))?;
    let mut cart = repo.load(user.id()).await?;
    cart.update_quantity(item_id, quantity)?;

    let updated = if quantity == 0 { repo.remove(user.id(), item_id).await? } else { repo.set_quantity(user.id(), item_id, quantity).await? };
    if !updated {
        return Err(AppError::not_found("Cart item"));
    }
    Ok(Json(repo.load(user.id()).await?))
}

async fn remove_item(State(s): State<AppState>, user: AuthUser, ApiPath(item_id): ApiPath<Uuid>) -> Result<Json<Cart>> {
    let repo = CartRepository::new(&s.db);
    let mut cart = repo.load(user.id()).await?;
    cart.remove_item(item_id)?;
    if !repo.remove(user.id(), item_id).await? {
        return Err(AppError::not_found("Cart item"));
    }
    Ok(Json(repo.load(user.id()).await?))
}

async fn clear_cart(State(s): State<AppState>, user: AuthUser) -> Result<Json<Cart>> {
    CartRepository::new(&s.db).clear(user.id()).await?;
    Ok(Json(Cart::new(user.id())))
}

async fn merge_cart(State(s): State<AppState>, user: AuthUser, ValidatedJson(r): ValidatedJson<MergeCartRequest>) -> Result<Json<Cart>> {
    let repo = CartRepository::new(&s.db);
    let incoming = r.into_cart(user.id());
    if !incoming.is_empty() {
        repo.merge(user.id(), &incoming).await.map_err(|e| match e {
            RepositoryError::ForeignKey(_) => AppError::BadRequest("Invalid product in cart".into()),
            other => other.into(),
        })?;
        tracing::info!(user_id = %user.id(), lines = incoming.items().len(), "client cart merged");
    }
    Ok(Json(repo.load(user.id()).await?))
}
