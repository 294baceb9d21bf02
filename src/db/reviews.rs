//! Product reviews. One review per user per product.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::RepoResult;
use crate::domain::value_objects::Rating;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub user_name: String,
    pub created_at: DateTime<Utc>,
}

const REVIEW_SELECT: &str = "SELECT r.id, r.user_id, r.product_id, r.rating, r.comment, u.name AS user_name, r.created_at \
     FROM reviews r JOIN users u ON u.id = r.user_id";

pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_for_product(&self, product_id: Uuid) -> RepoResult<Vec<Review>> {
        let reviews = sqlx::query_as::<_, Review>(&format!("{REVIEW_SELECT} WHERE r.product_id = $1 ORDER BY r.created_at DESC"))
            .bind(product_id)
            .fetch_all(self.pool)
            .await?;
        Ok(reviews)
    }

    pub async fn get(&self, id: Uuid) -> RepoResult<Option<Review>> {
        let review = sqlx::query_as::<_, Review>(&format!("{REVIEW_SELECT} WHERE r.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(review)
    }

    /// Returns `RepositoryError::Conflict` when the user already reviewed the product.
    pub async fn create(&self, user_id: Uuid, product_id: Uuid, rating: Rating, comment: Option<&str>) -> RepoResult<Review> {
        let id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO reviews (id, user_id, product_id, rating, comment) VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(Uuid::now_v7())
        .bind(user_id)
        .bind(product_id)
        .bind(i32::from(rating))
        .bind(comment)
        .fetch_one(self.pool)
        .await?;
        let review = sqlx::query_as::<_, Review>(&format!("{REVIEW_SELECT} WHERE r.id = $1"))
            .bind(id)
            .fetch_one(self.pool)
            .await?;
        Ok(review)
    }

    pub async fn delete(&self, id: Uuid) -> RepoResult<bool> {
        let res = sqlx::query("DELETE FROM reviews WHERE id = $1").bind(id).execute(self.pool).await?;
        Ok(res.rows_affected() == 1)
    }
}
