//! `/api/orders`

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{AdminUser, AuthUser};
use crate::db::orders::{OrderRepository, OrderWithItems};
use crate::db::RepositoryError;
use crate::domain::aggregates::{LineItem, NewOrder, OrderStatus, ShippingAddress};
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::Money;
use crate::error::{AppError, Result};
use crate::extract::{ApiPath, ValidatedJson};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/:id", get(get_order))
        .route("/:id/status", put(update_status))
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub product_id: Uuid,
    pub quantity: i64,
    pub price: Decimal,
    pub size: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[validate(length(max = 100, message = "Too many items"))]
    pub items: Vec<OrderItemRequest>,
    pub shipping_address: ShippingAddress,
    #[validate(length(max = 50))]
    pub payment_method: Option<String>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

impl CreateOrderRequest {
    fn into_order(self, user_id: Uuid) -> Result<NewOrder> {
        let items = self
            .items
            .into_iter()
            .map(|i| LineItem {
                product_id: i.product_id,
                // Out-of-range quantities collapse to 0, which placement rejects.
                quantity: u32::try_from(i.quantity).unwrap_or(0),
                unit_price: Money::new(i.price),
                size: i.size,
                color: i.color,
            })
            .collect();
        Ok(NewOrder::place(user_id, items, self.shipping_address, self.payment_method, self.notes)?)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStatusRequest {
    #[validate(length(min = 1, message = "Status is required"))]
    pub status: String,
}

async fn create_order(
    State(s): State<AppState>,
    user: AuthUser,
    ValidatedJson(r): ValidatedJson<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderWithItems>)> {
    let order = r.into_order(user.id())?;
    let created = OrderRepository::new(&s.db).create(&order).await.map_err(|e| match e {
        RepositoryError::ForeignKey(_) => AppError::BadRequest("Invalid product in order".into()),
        other => other.into(),
    })?;

    let order_id = created.order.id;
    tracing::info!(%order_id, user_id = %user.id(), total = %created.order.total, "order placed");
    s.events
        .publish(DomainEvent::OrderCreated {
            order_id,
            user_id: user.id(),
            total: created.order.total,
            item_count: created.items.len(),
        })
        .await;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn list_orders(State(s): State<AppState>, user: AuthUser) -> Result<Json<Vec<OrderWithItems>>> {
    Ok(Json(OrderRepository::new(&s.db).list_for_user(user.id()).await?))
}

async fn get_order(State(s): State<AppState>, user: AuthUser, ApiPath(id): ApiPath<Uuid>) -> Result<Json<OrderWithItems>> {
    let order = OrderRepository::new(&s.db).get(id).await?.ok_or_else(|| AppError::not_found("Order"))?;
    if !user.can_access(order.order.user_id) {
        return Err(AppError::Forbidden("Access denied".into()));
    }
    Ok(Json(order))
}

async fn update_status(
    State(s): State<AppState>,
    admin: AdminUser,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(r): ValidatedJson<UpdateStatusRequest>,
) -> Result<Json<OrderWithItems>> {
    let status: OrderStatus = r.status.parse()?;
    let (previous, order) = OrderRepository::new(&s.db)
        .set_status(id, status)
        .await?
        .ok_or_else(|| AppError::not_found("Order"))?;

    tracing::info!(order_id = %id, from = %previous, to = %status, actor = admin.actor(), "order status changed");
    s.events.publish(DomainEvent::OrderStatusChanged { order_id: id, from: previous, to: status }).await;
    Ok(Json(order))
}
