//! `/api/admin`: back-office endpoints. Everything except `simple-auth`
//! requires `AdminUser`.

use axum::{
    extract::State,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{AdminUser, AuthError};
use crate::db::orders::{OrderRepository, OrderSummary};
use crate::db::products::{ProductRepository, ProductSummary};
use crate::db::stats::{self, DashboardStats};
use crate::db::users::{User, UserRepository};
use crate::db::{Page, Paginated};
use crate::domain::aggregates::{OrderStatus, Role};
use crate::error::{AppError, Result};
use crate::extract::{ApiPath, ApiQuery, ValidatedJson};
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: u32 = 20;
const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 5;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/stats", get(dashboard))
        .route("/orders", get(list_orders))
        .route("/users", get(list_users))
        .route("/users/:id/role", put(set_role))
        .route("/products/low-stock", get(low_stock))
        .route("/simple-auth", post(simple_auth))
}

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OrderListParams {
    pub status: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LowStockParams {
    pub threshold: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RoleRequest {
    #[validate(length(min = 1, message = "Role is required"))]
    pub role: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SimpleAuthRequest {
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

async fn dashboard(State(s): State<AppState>, _admin: AdminUser) -> Result<Json<DashboardStats>> {
    Ok(Json(stats::dashboard(&s.db).await?))
}

async fn list_orders(State(s): State<AppState>, _admin: AdminUser, ApiQuery(p): ApiQuery<OrderListParams>) -> Result<Json<Paginated<OrderSummary>>> {
    let status = p
        .status
        .as_deref()
        .map(str::trim)
        .filter(|st| !st.is_empty() && !st.eq_ignore_ascii_case("all"))
        .map(str::parse::<OrderStatus>)
        .transpose()?;
    let page = Page::new(p.page, p.limit, DEFAULT_PAGE_SIZE);
    let (data, total) = OrderRepository::new(&s.db).list_all(status, page).await?;
    Ok(Json(Paginated::new(data, total, page)))
}

async fn list_users(State(s): State<AppState>, _admin: AdminUser, ApiQuery(p): ApiQuery<PageParams>) -> Result<Json<Paginated<User>>> {
    let page = Page::new(p.page, p.limit, DEFAULT_PAGE_SIZE);
    let (data, total) = UserRepository::new(&s.db).list(page).await?;
    Ok(Json(Paginated::new(data, total, page)))
}

async fn set_role(
    State(s): State<AppState>,
    admin: AdminUser,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(r): ValidatedJson<RoleRequest>,
) -> Result<Json<User>> {
    let role: Role = r.role.parse()?;
    let user = UserRepository::new(&s.db).set_role(id, role).await?.ok_or_else(|| AppError::not_found("User"))?;
    tracing::info!(user_id = %id, ?role, actor = admin.actor(), "user role changed");
    Ok(Json(user))
}

async fn low_stock(State(s): State<AppState>, _admin: AdminUser, ApiQuery(p): ApiQuery<LowStockParams>) -> Result<Json<Vec<ProductSummary>>> {
    let threshold = p.threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD).max(0);
    Ok(Json(ProductRepository::new(&s.db).low_stock(threshold).await?))
}

/// Password check for the back-office login screen. 404 when disabled.
async fn simple_auth(State(s): State<AppState>, ValidatedJson(r): ValidatedJson<SimpleAuthRequest>) -> Result<Json<Value>> {
    s.simple_admin.check(&r.password).map_err(|e| {
        if matches!(e, AuthError::InvalidCredentials) {
            tracing::warn!("simple admin login rejected");
        }
        e
    })?;
    Ok(Json(json!({ "success": true })))
}
