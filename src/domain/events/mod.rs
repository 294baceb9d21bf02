//! Domain events
use crate::domain::aggregates::OrderStatus;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    UserRegistered { user_id: Uuid },
    OrderCreated { order_id: Uuid, user_id: Uuid, total: Decimal, item_count: usize },
    OrderStatusChanged { order_id: Uuid, from: OrderStatus, to: OrderStatus },
    ReviewPosted { review_id: Uuid, product_id: Uuid, rating: i32 },
}

impl DomainEvent {
    /// Subject suffix under the service prefix, e.g. `order.created`.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::UserRegistered { .. } => "user.registered",
            Self::OrderCreated { .. } => "order.created",
            Self::OrderStatusChanged { .. } => "order.status_changed",
            Self::ReviewPosted { .. } => "review.posted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_payload() {
        let id = Uuid::nil();
        let e = DomainEvent::OrderStatusChanged { order_id: id, from: OrderStatus::Pending, to: OrderStatus::Shipped };
        assert_eq!(e.subject(), "order.status_changed");
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["type"], "order_status_changed");
        assert_eq!(json["to"], "SHIPPED");
    }
}
