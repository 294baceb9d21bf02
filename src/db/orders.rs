//! Orders and their line items.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{Page, RepoResult, RepositoryError};
use crate::domain::aggregates::{NewOrder, OrderStatus, ShippingAddress};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: OrderStatus,
    pub total: Decimal,
    #[sqlx(flatten)]
    pub shipping_address: ShippingAddress,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: Uuid,
    #[serde(skip)]
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub image_url: Option<String>,
    pub quantity: i32,
    pub price: Decimal,
    pub size: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Admin listing row.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub order: Order,
    pub customer_email: String,
    pub customer_name: String,
    pub item_count: i64,
}

const ORDER_COLUMNS: &str = "o.id, o.user_id, o.status, o.total, o.full_name, o.address_line1, o.address_line2, o.city, \
     o.state, o.postal_code, o.country, o.phone, o.payment_method, o.notes, o.created_at, o.updated_at";

const ITEM_SELECT: &str = "SELECT oi.id, oi.order_id, oi.product_id, oi.product_name, \
     (SELECT i.url FROM product_images i WHERE i.product_id = oi.product_id ORDER BY i.position LIMIT 1) AS image_url, \
     oi.quantity, oi.price, oi.size, oi.color FROM order_items oi";

const SUMMARY_SELECT: &str = "SELECT o.id, o.user_id, o.status, o.total, o.full_name, o.address_line1, o.address_line2, o.city, \
     o.state, o.postal_code, o.country, o.phone, o.payment_method, o.notes, o.created_at, o.updated_at, \
     u.email AS customer_email, u.name AS customer_name, \
     (SELECT COALESCE(SUM(oi.quantity), 0)::BIGINT FROM order_items oi WHERE oi.order_id = o.id) AS item_count \
     FROM orders o JOIN users u ON u.id = o.user_id";

pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Order row and item rows are written in one transaction. Product names are
    /// snapshotted; an unknown product id rolls everything back with
    /// `RepositoryError::ForeignKey`.
    pub async fn create(&self, order: &NewOrder) -> RepoResult<OrderWithItems> {
        let mut tx = self.pool.begin().await?;
        let id = Uuid::now_v7();
        let addr = order.shipping_address();
        sqlx::query(
            "INSERT INTO orders (id, user_id, status, total, full_name, address_line1, address_line2, city, state, \
             postal_code, country, phone, payment_method, notes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(id)
        .bind(order.user_id())
        .bind(OrderStatus::Pending)
        .bind(order.total().amount())
        .bind(&addr.full_name)
        .bind(&addr.address_line1)
        .bind(&addr.address_line2)
        .bind(&addr.city)
        .bind(&addr.state)
        .bind(&addr.postal_code)
        .bind(&addr.country)
        .bind(&addr.phone)
        .bind(order.payment_method())
        .bind(order.notes())
        .execute(&mut *tx)
        .await?;

        for line in order.items() {
            let inserted = sqlx::query(
                "INSERT INTO order_items (id, order_id, product_id, product_name, quantity, price, size, color) \
                 SELECT $1, $2, p.id, p.name, $4, $5, $6, $7 FROM products p WHERE p.id = $3",
            )
            .bind(Uuid::now_v7())
            .bind(id)
            .bind(line.product_id)
            .bind(line.quantity as i32)
            .bind(line.unit_price.amount())
            .bind(&line.size)
            .bind(&line.color)
            .execute(&mut *tx)
            .await?;
            if inserted.rows_affected() == 0 {
                return Err(RepositoryError::ForeignKey(format!("product {}", line.product_id)));
            }
        }

        let created = fetch_one_with_items(&mut tx, id).await?.ok_or(RepositoryError::Database(sqlx::Error::RowNotFound))?;
        tx.commit().await?;
        Ok(created)
    }

    pub async fn get(&self, id: Uuid) -> RepoResult<Option<OrderWithItems>> {
        let mut conn = self.pool.acquire().await?;
        fetch_one_with_items(&mut conn, id).await
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> RepoResult<Vec<OrderWithItems>> {
        let orders = sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} FROM orders o WHERE o.user_id = $1 ORDER BY o.created_at DESC"))
            .bind(user_id)
            .fetch_all(self.pool)
            .await?;
        let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        let items = sqlx::query_as::<_, OrderItem>(&format!("{ITEM_SELECT} WHERE oi.order_id = ANY($1) ORDER BY oi.id"))
            .bind(&ids)
            .fetch_all(self.pool)
            .await?;
        Ok(attach_items(orders, items))
    }

    /// Sets the status unconditionally and returns the previous one with the updated order.
    pub async fn set_status(&self, id: Uuid, status: OrderStatus) -> RepoResult<Option<(OrderStatus, OrderWithItems)>> {
        let mut tx = self.pool.begin().await?;
        let Some(previous) = sqlx::query_scalar::<_, OrderStatus>("SELECT status FROM orders WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };
        sqlx::query("UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&mut *tx)
            .await?;
        let updated = fetch_one_with_items(&mut tx, id).await?;
        tx.commit().await?;
        Ok(updated.map(|o| (previous, o)))
    }

    pub async fn list_all(&self, status: Option<OrderStatus>, page: Page) -> RepoResult<(Vec<OrderSummary>, i64)> {
        let mut qb = QueryBuilder::<Postgres>::new(SUMMARY_SELECT);
        push_status_filter(&mut qb, status);
        qb.push(" ORDER BY o.created_at DESC LIMIT ").push_bind(page.limit()).push(" OFFSET ").push_bind(page.offset());
        let orders = qb.build_query_as::<OrderSummary>().fetch_all(self.pool).await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM orders o");
        push_status_filter(&mut count, status);
        let total = count.build_query_scalar::<i64>().fetch_one(self.pool).await?;
        Ok((orders, total))
    }

    pub async fn recent(&self, limit: i64) -> RepoResult<Vec<OrderSummary>> {
        let orders = sqlx::query_as::<_, OrderSummary>(&format!("{SUMMARY_SELECT} ORDER BY o.created_at DESC LIMIT $1"))
            .bind(limit)
            .fetch_all(self.pool)
            .await?;
        Ok(orders)
    }
}

fn push_status_filter(qb: &mut QueryBuilder<'_, Postgres>, status: Option<OrderStatus>) {
    if let Some(status) = status {
        qb.push(" WHERE o.status = ").push_bind(status);
    }
}

async fn fetch_one_with_items(conn: &mut PgConnection, id: Uuid) -> RepoResult<Option<OrderWithItems>> {
    let Some(order) = sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} FROM orders o WHERE o.id = $1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
    else {
        return Ok(None);
    };
    let items = sqlx::query_as::<_, OrderItem>(&format!("{ITEM_SELECT} WHERE oi.order_id = $1 ORDER BY oi.id"))
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(Some(OrderWithItems { order, items }))
}

fn attach_items(orders: Vec<Order>, items: Vec<OrderItem>) -> Vec<OrderWithItems> {
    let mut by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for item in items {
        by_order.entry(item.order_id).or_default().push(item);
    }
    orders
        .into_iter()
        .map(|order| {
            let items = by_order.remove(&order.id).unwrap_or_default();
            OrderWithItems { order, items }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(id: Uuid) -> Order {
        Order {
            id,
            user_id: Uuid::nil(),
            status: OrderStatus::Pending,
            total: Decimal::new(1000, 2),
            shipping_address: ShippingAddress::default(),
            payment_method: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn item(order_id: Uuid) -> OrderItem {
        OrderItem {
            id: Uuid::new_v4(),
            order_id,
            product_id: Uuid::new_v4(),
            product_name: "Canvas Tote".into(),
            image_url: None,
            quantity: 1,
            price: Decimal::new(1000, 2),
            size: None,
            color: None,
        }
    }

    #[test]
    fn test_attach_items_groups_by_order() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let grouped = attach_items(vec![order(a), order(b)], vec![item(a), item(b), item(a)]);
        assert_eq!(grouped[0].items.len(), 2);
        assert_eq!(grouped[1].items.len(), 1);
    }

    #[test]
    fn test_order_json_shape() {
        let id = Uuid::new_v4();
        let json = serde_json::to_value(OrderWithItems { order: order(id), items: vec![item(id)] }).unwrap();
        assert_eq!(json["status"], "PENDING");
        assert!(json["shippingAddress"].is_object());
        assert!(json["items"][0].get("orderId").is_none());
        assert_eq!(json["items"][0]["productName"], "Canvas Tote");
    }

    #[test]
    fn test_status_filter_sql() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM orders o");
        push_status_filter(&mut qb, Some(OrderStatus::Shipped));
        assert_eq!(qb.sql(), "SELECT COUNT(*) FROM orders o WHERE o.status = $1");
    }
}
