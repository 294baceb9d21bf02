//! Saved products per user.

use sqlx::PgPool;
use uuid::Uuid;

use super::products::{ProductSummary, SUMMARY_FROM, SUMMARY_SELECT};
use super::RepoResult;

pub struct WishlistRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> WishlistRepository<'a> {
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, user_id: Uuid) -> RepoResult<Vec<ProductSummary>> {
        let products = sqlx::query_as::<_, ProductSummary>(&format!(
            "{SUMMARY_SELECT}{SUMMARY_FROM} JOIN wishlist_items w ON w.product_id = p.id WHERE w.user_id = $1 ORDER BY w.created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(products)
    }

    /// Adding a product twice is a no-op. Returns `RepositoryError::ForeignKey` for an unknown product.
    pub async fn add(&self, user_id: Uuid, product_id: Uuid) -> RepoResult<()> {
        sqlx::query("INSERT INTO wishlist_items (user_id, product_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(user_id)
            .bind(product_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    pub async fn remove(&self, user_id: Uuid, product_id: Uuid) -> RepoResult<bool> {
        let res = sqlx::query("DELETE FROM wishlist_items WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(self.pool)
            .await?;
        Ok(res.rows_affected() == 1)
    }
}
