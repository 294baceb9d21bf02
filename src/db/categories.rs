//! Product categories.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::RepoResult;
use crate::domain::value_objects::Slug;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub product_count: i64,
}

#[derive(Debug, Clone)]
pub struct CategoryInput {
    pub name: String,
    pub slug: Slug,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

const CATEGORY_SELECT: &str = "SELECT c.id, c.name, c.slug, c.description, c.image_url, c.created_at, \
     (SELECT COUNT(*) FROM products p WHERE p.category_id = c.id) AS product_count \
     FROM categories c";

pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> RepoResult<Vec<Category>> {
        let cats = sqlx::query_as::<_, Category>(&format!("{CATEGORY_SELECT} ORDER BY c.name"))
            .fetch_all(self.pool)
            .await?;
        Ok(cats)
    }

    pub async fn get_by_slug(&self, slug: &str) -> RepoResult<Option<Category>> {
        let cat = sqlx::query_as::<_, Category>(&format!("{CATEGORY_SELECT} WHERE c.slug = $1"))
            .bind(slug)
            .fetch_optional(self.pool)
            .await?;
        Ok(cat)
    }

    async fn get(&self, id: Uuid) -> RepoResult<Option<Category>> {
        let cat = sqlx::query_as::<_, Category>(&format!("{CATEGORY_SELECT} WHERE c.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(cat)
    }

    /// Returns `RepositoryError::Conflict` when the slug is taken.
    pub async fn create(&self, input: &CategoryInput) -> RepoResult<Category> {
        let cat = sqlx::query_as::<_, Category>(
            "INSERT INTO categories (id, name, slug, description, image_url) VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, name, slug, description, image_url, created_at, 0::BIGINT AS product_count",
        )
        .bind(Uuid::now_v7())
        .bind(&input.name)
        .bind(input.slug.as_str())
        .bind(&input.description)
        .bind(&input.image_url)
        .fetch_one(self.pool)
        .await?;
        Ok(cat)
    }

    pub async fn update(&self, id: Uuid, input: &CategoryInput) -> RepoResult<Option<Category>> {
        let res = sqlx::query("UPDATE categories SET name = $2, slug = $3, description = $4, image_url = $5 WHERE id = $1")
            .bind(id)
            .bind(&input.name)
            .bind(input.slug.as_str())
            .bind(&input.description)
            .bind(&input.image_url)
            .execute(self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Ok(None);
        }
        self.get(id).await
    }

    /// Products in the category are kept and lose their category.
    pub async fn delete(&self, id: Uuid) -> RepoResult<bool> {
        let res = sqlx::query("DELETE FROM categories WHERE id = $1").bind(id).execute(self.pool).await?;
        Ok(res.rows_affected() == 1)
    }
}
