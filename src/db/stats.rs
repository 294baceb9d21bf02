//! Dashboard aggregates for the admin back-office.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use super::orders::{OrderRepository, OrderSummary};
use super::RepoResult;
use crate::domain::aggregates::OrderStatus;

const RECENT_ORDERS: i64 = 5;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: i64,
    pub total_products: i64,
    pub total_orders: i64,
    /// Sum of order totals, cancelled orders excluded.
    pub revenue: Decimal,
    pub orders_by_status: BTreeMap<&'static str, i64>,
    pub recent_orders: Vec<OrderSummary>,
}

#[derive(sqlx::FromRow)]
struct Counts {
    total_users: i64,
    total_products: i64,
    total_orders: i64,
    revenue: Decimal,
}

pub async fn dashboard(pool: &PgPool) -> RepoResult<DashboardStats> {
    let counts = sqlx::query_as::<_, Counts>(
        "SELECT (SELECT COUNT(*) FROM users) AS total_users, \
                (SELECT COUNT(*) FROM products) AS total_products, \
                (SELECT COUNT(*) FROM orders) AS total_orders, \
                (SELECT COALESCE(SUM(total), 0) FROM orders WHERE status <> $1) AS revenue",
    )
    .bind(OrderStatus::Cancelled)
    .fetch_one(pool)
    .await?;

    let rows = sqlx::query_as::<_, (OrderStatus, i64)>("SELECT status, COUNT(*) FROM orders GROUP BY status")
        .fetch_all(pool)
        .await?;

    let recent_orders = OrderRepository::new(pool).recent(RECENT_ORDERS).await?;

    Ok(DashboardStats {
        total_users: counts.total_users,
        total_products: counts.total_products,
        total_orders: counts.total_orders,
        revenue: counts.revenue,
        orders_by_status: status_breakdown(rows),
        recent_orders,
    })
}

/// Every status is present, zero when no order has it.
fn status_breakdown(rows: Vec<(OrderStatus, i64)>) -> BTreeMap<&'static str, i64> {
    let mut map: BTreeMap<&'static str, i64> = OrderStatus::ALL.iter().map(|s| (s.as_str(), 0)).collect();
    for (status, count) in rows {
        map.insert(status.as_str(), count);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_breakdown_fills_missing() {
        let map = status_breakdown(vec![(OrderStatus::Shipped, 4)]);
        assert_eq!(map.len(), OrderStatus::ALL.len());
        assert_eq!(map["SHIPPED"], 4);
        assert_eq!(map["PENDING"], 0);
    }
}
