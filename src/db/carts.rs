//! Server-side carts, one per user, created on first write.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::RepoResult;
use crate::domain::aggregates::{Cart, CartItem, NewOrder};
use crate::domain::value_objects::Money;

#[derive(Debug, Clone, sqlx::FromRow)]
struct CartLine {
    id: Uuid,
    product_id: Uuid,
    name: String,
    image_url: Option<String>,
    size: Option<String>,
    color: Option<String>,
    quantity: i32,
    price: Decimal,
    stock: i32,
}

impl From<CartLine> for CartItem {
    fn from(l: CartLine) -> Self {
        CartItem {
            id: l.id,
            product_id: l.product_id,
            name: l.name,
            image_url: l.image_url,
            size: l.size,
            color: l.color,
            quantity: u32::try_from(l.quantity).unwrap_or(0),
            unit_price: Money::new(l.price),
            stock: l.stock,
        }
    }
}

pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Current cart with live product name, price and stock. Empty when the user has no cart row yet.
    pub async fn load(&self, user_id: Uuid) -> RepoResult<Cart> {
        let lines = sqlx::query_as::<_, CartLine>(
            "SELECT ci.id, ci.product_id, p.name, \
             (SELECT i.url FROM product_images i WHERE i.product_id = p.id ORDER BY i.position LIMIT 1) AS image_url, \
             ci.size, ci.color, ci.quantity, p.price, p.stock \
             FROM cart_items ci JOIN carts c ON c.id = ci.cart_id JOIN products p ON p.id = ci.product_id \
             WHERE c.user_id = $1 ORDER BY ci.created_at",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(Cart::with_items(user_id, lines.into_iter().map(CartItem::from)))
    }

    /// Returns `RepositoryError::ForeignKey` for an unknown product.
    pub async fn add(&self, user_id: Uuid, product_id: Uuid, quantity: u32, size: Option<&str>, color: Option<&str>) -> RepoResult<()> {
        let mut conn = self.pool.acquire().await?;
        add_line(&mut conn, user_id, product_id, quantity, size, color).await
    }

    /// Adds every line of `incoming` in one transaction.
    pub async fn merge(&self, user_id: Uuid, incoming: &Cart) -> RepoResult<()> {
        let mut tx = self.pool.begin().await?;
        for item in incoming.items() {
            add_line(&mut tx, user_id, item.product_id, item.quantity, item.size.as_deref(), item.color.as_deref()).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn set_quantity(&self, user_id: Uuid, item_id: Uuid, quantity: u32) -> RepoResult<bool> {
        let res = sqlx::query(
            "UPDATE cart_items ci SET quantity = $3 FROM carts c WHERE ci.cart_id = c.id AND c.user_id = $1 AND ci.id = $2",
        )
        .bind(user_id)
        .bind(item_id)
        .bind(quantity as i32)
        .execute(self.pool)
        .await?;
        Ok(res.rows_affected() == 1)
    }

    pub async fn remove(&self, user_id: Uuid, item_id: Uuid) -> RepoResult<bool> {
        let res = sqlx::query("DELETE FROM cart_items ci USING carts c WHERE ci.cart_id = c.id AND c.user_id = $1 AND ci.id = $2")
            .bind(user_id)
            .bind(item_id)
            .execute(self.pool)
            .await?;
        Ok(res.rows_affected() == 1)
    }

    pub async fn clear(&self, user_id: Uuid) -> RepoResult<()> {
        sqlx::query("DELETE FROM cart_items ci USING carts c WHERE ci.cart_id = c.id AND c.user_id = $1")
            .bind(user_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}

/// Same product, size and colour adds to the existing line, capped at
/// `NewOrder::MAX_QUANTITY`; otherwise a new line is inserted.
async fn add_line(conn: &mut PgConnection, user_id: Uuid, product_id: Uuid, quantity: u32, size: Option<&str>, color: Option<&str>) -> RepoResult<()> {
    let max_quantity = NewOrder::MAX_QUANTITY as i32;
    let quantity = quantity.min(NewOrder::MAX_QUANTITY);
    let cart_id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO carts (id, user_id) VALUES ($1, $2) ON CONFLICT (user_id) DO UPDATE SET updated_at = NOW() RETURNING id",
    )
    .bind(Uuid::now_v7())
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await?;

    let merged = sqlx::query(
        "UPDATE cart_items SET quantity = LEAST(quantity + $2, $6) \
         WHERE cart_id = $1 AND product_id = $3 AND size IS NOT DISTINCT FROM $4 AND color IS NOT DISTINCT FROM $5",
    )
    .bind(cart_id)
    .bind(quantity as i32)
    .bind(product_id)
    .bind(size)
    .bind(color)
    .bind(max_quantity)
    .execute(&mut *conn)
    .await?;

    if merged.rows_affected() == 0 {
        sqlx::query("INSERT INTO cart_items (id, cart_id, product_id, quantity, size, color) VALUES ($1, $2, $3, $4, $5, $6)")
            .bind(Uuid::now_v7())
            .bind(cart_id)
            .bind(product_id)
            .bind(quantity as i32)
            .bind(size)
            .bind(color)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}
