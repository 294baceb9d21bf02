//! Product catalog: listing with filters, detail with child rows, admin writes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{Page, RepoResult, RepositoryError};
use crate::domain::aggregates::{Gender, ProductSort};
use crate::domain::value_objects::Slug;

/// Listing row: product columns plus category, lead image and rating summary.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub stock: i32,
    pub gender: Gender,
    pub featured: bool,
    pub category_id: Option<Uuid>,
    pub category_name: Option<String>,
    pub category_slug: Option<String>,
    pub image_url: Option<String>,
    pub average_rating: Option<Decimal>,
    pub review_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProductImage { pub id: Uuid, pub url: String, pub alt: Option<String>, pub position: i32 }

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProductColor { pub name: String, #[serde(default)] pub hex: Option<String> }

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: ProductSummary,
    pub images: Vec<ProductImage>,
    pub sizes: Vec<String>,
    pub colors: Vec<ProductColor>,
    pub features: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageInput { pub url: String, #[serde(default)] pub alt: Option<String> }

/// Child lists. A `None` list leaves existing rows untouched; `Some` replaces them.
#[derive(Debug, Clone, Default)]
pub struct ProductChildren {
    pub images: Option<Vec<ImageInput>>,
    pub sizes: Option<Vec<String>>,
    pub colors: Option<Vec<ProductColor>>,
    pub features: Option<Vec<String>>,
}

/// Fields written on create.
#[derive(Debug, Clone)]
pub struct ProductInput {
    pub name: String,
    pub slug: Slug,
    pub description: Option<String>,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub stock: i32,
    pub gender: Gender,
    pub featured: bool,
    pub category_id: Option<Uuid>,
    pub children: ProductChildren,
}

/// Partial update. `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub slug: Option<Slug>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub compare_at_price: Option<Decimal>,
    pub stock: Option<i32>,
    pub gender: Option<Gender>,
    pub featured: Option<bool>,
    pub category_id: Option<Uuid>,
    pub children: ProductChildren,
}

pub(super) const SUMMARY_SELECT: &str = "SELECT p.id, p.name, p.slug, p.description, p.price, p.compare_at_price, p.stock, \
     p.gender, p.featured, p.category_id, c.name AS category_name, c.slug AS category_slug, \
     (SELECT i.url FROM product_images i WHERE i.product_id = p.id ORDER BY i.position LIMIT 1) AS image_url, \
     r.average_rating, COALESCE(r.review_count, 0) AS review_count, p.created_at, p.updated_at";

pub(super) const SUMMARY_FROM: &str = " FROM products p \
     LEFT JOIN categories c ON c.id = p.category_id \
     LEFT JOIN (SELECT product_id, ROUND(AVG(rating), 2) AS average_rating, COUNT(*) AS review_count \
                FROM reviews GROUP BY product_id) r ON r.product_id = p.id";

/// Query-string filters, translated one-to-one into `WHERE` terms.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Category slug or id.
    pub category: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub gender: Option<Gender>,
    pub featured: Option<bool>,
    /// Case-insensitive substring over name and description.
    pub search: Option<String>,
}

impl ProductFilter {
    pub fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE TRUE");
        if let Some(category) = &self.category {
            qb.push(" AND (c.slug = ").push_bind(category.clone()).push(" OR c.id::text = ").push_bind(category.clone()).push(")");
        }
        if let Some(min) = self.min_price {
            qb.push(" AND p.price >= ").push_bind(min);
        }
        if let Some(max) = self.max_price {
            qb.push(" AND p.price <= ").push_bind(max);
        }
        if let Some(size) = &self.size {
            qb.push(" AND EXISTS (SELECT 1 FROM product_sizes s WHERE s.product_id = p.id AND LOWER(s.name) = LOWER(")
                .push_bind(size.clone())
                .push("))");
        }
        if let Some(color) = &self.color {
            qb.push(" AND EXISTS (SELECT 1 FROM product_colors pc WHERE pc.product_id = p.id AND LOWER(pc.name) = LOWER(")
                .push_bind(color.clone())
                .push("))");
        }
        if let Some(gender) = self.gender {
            qb.push(" AND p.gender = ").push_bind(gender);
        }
        if let Some(featured) = self.featured {
            qb.push(" AND p.featured = ").push_bind(featured);
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = like_pattern(search);
            qb.push(" AND (p.name ILIKE ").push_bind(pattern.clone()).push(" OR p.description ILIKE ").push_bind(pattern).push(")");
        }
    }
}

fn like_pattern(term: &str) -> String {
    let escaped = term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("%{escaped}%")
}

pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, filter: &ProductFilter, sort: ProductSort, page: Page) -> RepoResult<(Vec<ProductSummary>, i64)> {
        let mut qb = QueryBuilder::<Postgres>::new(SUMMARY_SELECT);
        qb.push(SUMMARY_FROM);
        filter.push_where(&mut qb);
        qb.push(" ORDER BY ").push(sort.order_by());
        qb.push(" LIMIT ").push_bind(page.limit()).push(" OFFSET ").push_bind(page.offset());
        let products = qb.build_query_as::<ProductSummary>().fetch_all(self.pool).await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*)");
        count.push(SUMMARY_FROM);
        filter.push_where(&mut count);
        let total = count.build_query_scalar::<i64>().fetch_one(self.pool).await?;

        Ok((products, total))
    }

    pub async fn get(&self, id: Uuid) -> RepoResult<Option<ProductDetail>> {
        let mut conn = self.pool.acquire().await?;
        fetch_detail(&mut conn, id).await
    }

    pub async fn exists(&self, id: Uuid) -> RepoResult<bool> {
        let found = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM products WHERE id = $1)")
            .bind(id)
            .fetch_one(self.pool)
            .await?;
        Ok(found)
    }

    /// Returns `RepositoryError::Conflict` on a duplicate slug and
    /// `RepositoryError::ForeignKey` for an unknown category.
    pub async fn create(&self, input: &ProductInput) -> RepoResult<ProductDetail> {
        let mut tx = self.pool.begin().await?;
        let id = Uuid::now_v7();
        sqlx::query(
            "INSERT INTO products (id, name, slug, description, price, compare_at_price, stock, gender, featured, category_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(id)
        .bind(&input.name)
        .bind(input.slug.as_str())
        .bind(&input.description)
        .bind(input.price)
        .bind(input.compare_at_price)
        .bind(input.stock)
        .bind(input.gender)
        .bind(input.featured)
        .bind(input.category_id)
        .execute(&mut *tx)
        .await?;
        replace_children(&mut tx, id, &input.children).await?;
        let detail = fetch_detail(&mut tx, id).await?.ok_or(RepositoryError::Database(sqlx::Error::RowNotFound))?;
        tx.commit().await?;
        Ok(detail)
    }

    pub async fn update(&self, id: Uuid, patch: &ProductPatch) -> RepoResult<Option<ProductDetail>> {
        let mut tx = self.pool.begin().await?;
        let res = sqlx::query(
            "UPDATE products SET name = COALESCE($2, name), slug = COALESCE($3, slug), \
             description = COALESCE($4, description), price = COALESCE($5, price), \
             compare_at_price = COALESCE($6, compare_at_price), stock = COALESCE($7, stock), \
             gender = COALESCE($8, gender), featured = COALESCE($9, featured), \
             category_id = COALESCE($10, category_id), updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(&patch.name)
        .bind(patch.slug.as_ref().map(Slug::as_str))
        .bind(&patch.description)
        .bind(patch.price)
        .bind(patch.compare_at_price)
        .bind(patch.stock)
        .bind(patch.gender)
        .bind(patch.featured)
        .bind(patch.category_id)
        .execute(&mut *tx)
        .await?;
        if res.rows_affected() == 0 {
            return Ok(None);
        }
        replace_children(&mut tx, id, &patch.children).await?;
        let detail = fetch_detail(&mut tx, id).await?;
        tx.commit().await?;
        Ok(detail)
    }

    /// Returns `RepositoryError::ForeignKey` when order items still reference the product.
    pub async fn delete(&self, id: Uuid) -> RepoResult<bool> {
        let res = sqlx::query("DELETE FROM products WHERE id = $1").bind(id).execute(self.pool).await?;
        Ok(res.rows_affected() == 1)
    }

    pub async fn low_stock(&self, threshold: i32) -> RepoResult<Vec<ProductSummary>> {
        let products = sqlx::query_as::<_, ProductSummary>(&format!(
            "{SUMMARY_SELECT}{SUMMARY_FROM} WHERE p.stock <= $1 ORDER BY p.stock ASC, p.name ASC"
        ))
        .bind(threshold)
        .fetch_all(self.pool)
        .await?;
        Ok(products)
    }
}

async fn fetch_detail(conn: &mut PgConnection, id: Uuid) -> RepoResult<Option<ProductDetail>> {
    let Some(product) = sqlx::query_as::<_, ProductSummary>(&format!("{SUMMARY_SELECT}{SUMMARY_FROM} WHERE p.id = $1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
    else {
        return Ok(None);
    };

    let images = sqlx::query_as::<_, ProductImage>("SELECT id, url, alt, position FROM product_images WHERE product_id = $1 ORDER BY position")
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;
    let sizes = sqlx::query_scalar::<_, String>("SELECT name FROM product_sizes WHERE product_id = $1 ORDER BY position")
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;
    let colors = sqlx::query_as::<_, ProductColor>("SELECT name, hex FROM product_colors WHERE product_id = $1 ORDER BY position")
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;
    let features = sqlx::query_scalar::<_, String>("SELECT text FROM product_features WHERE product_id = $1 ORDER BY position")
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(Some(ProductDetail { product, images, sizes, colors, features }))
}

async fn replace_children(conn: &mut PgConnection, id: Uuid, input: &ProductChildren) -> RepoResult<()> {
    if let Some(images) = &input.images {
        sqlx::query("DELETE FROM product_images WHERE product_id = $1").bind(id).execute(&mut *conn).await?;
        for (position, image) in (0_i32..).zip(images) {
            sqlx::query("INSERT INTO product_images (id, product_id, url, alt, position) VALUES ($1, $2, $3, $4, $5)")
                .bind(Uuid::now_v7())
                .bind(id)
                .bind(&image.url)
                .bind(&image.alt)
                .bind(position)
                .execute(&mut *conn)
                .await?;
        }
    }
    if let Some(sizes) = &input.sizes {
        sqlx::query("DELETE FROM product_sizes WHERE product_id = $1").bind(id).execute(&mut *conn).await?;
        for (position, size) in (0_i32..).zip(sizes) {
            sqlx::query("INSERT INTO product_sizes (product_id, name, position) VALUES ($1, $2, $3)")
                .bind(id)
                .bind(size)
                .bind(position)
                .execute(&mut *conn)
                .await?;
        }
    }
    if let Some(colors) = &input.colors {
        sqlx::query("DELETE FROM product_colors WHERE product_id = $1").bind(id).execute(&mut *conn).await?;
        for (position, color) in (0_i32..).zip(colors) {
            sqlx::query("INSERT INTO product_colors (product_id, name, hex, position) VALUES ($1, $2, $3, $4)")
                .bind(id)
                .bind(&color.name)
                .bind(&color.hex)
                .bind(position)
                .execute(&mut *conn)
                .await?;
        }
    }
    if let Some(features) = &input.features {
        sqlx::query("DELETE FROM product_features WHERE product_id = $1").bind(id).execute(&mut *conn).await?;
        for (position, text) in (0_i32..).zip(features) {
            sqlx::query("INSERT INTO product_features (product_id, text, position) VALUES ($1, $2, $3)")
                .bind(id)
                .bind(text)
                .bind(position)
                .execute(&mut *conn)
                .await?;
        }
    }
    Ok(())
}
