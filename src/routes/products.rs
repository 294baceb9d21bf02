//! `/api/products`: public catalog plus admin writes.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use crate::auth::AdminUser;
use crate::db::products::{
    ImageInput, ProductChildren, ProductColor, ProductDetail, ProductFilter, ProductInput, ProductPatch, ProductRepository, ProductSummary,
};
use crate::db::{Page, Paginated, RepositoryError};
use crate::domain::aggregates::{Gender, ProductSort};
use crate::domain::value_objects::{Money, MoneyError, Slug};
use crate::error::{AppError, Result};
use crate::extract::{ApiPath, ApiQuery, ValidatedJson};
use crate::state::AppState;

pub const DEFAULT_PAGE_SIZE: u32 = 12;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/:id", get(get_product).put(update_product).delete(delete_product))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub category: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub gender: Option<String>,
    pub featured: Option<bool>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ListParams {
    /// Empty query values (`?category=`) are treated as absent.
    fn filter(&self) -> Result<ProductFilter> {
        let present = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
        let gender = present(&self.gender).map(|g| g.parse::<Gender>()).transpose()?;
        Ok(ProductFilter {
            category: present(&self.category),
            min_price: self.min_price,
            max_price: self.max_price,
            size: present(&self.size),
            color: present(&self.color),
            gender,
            featured: self.featured,
            search: present(&self.search),
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProductRequest {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 200))]
    pub slug: Option<String>,
    pub description: Option<String>,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    #[serde(default)]
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock: i32,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub featured: bool,
    pub category_id: Option<Uuid>,
    pub images: Option<Vec<ImageInput>>,
    pub sizes: Option<Vec<String>>,
    pub colors: Option<Vec<ProductColor>>,
    pub features: Option<Vec<String>>,
}

/// Partial update body; absent fields keep their stored values.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub slug: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub compare_at_price: Option<Decimal>,
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock: Option<i32>,
    pub gender: Option<Gender>,
    pub featured: Option<bool>,
    pub category_id: Option<Uuid>,
    pub images: Option<Vec<ImageInput>>,
    pub sizes: Option<Vec<String>>,
    pub colors: Option<Vec<ProductColor>>,
    pub features: Option<Vec<String>>,
}

fn checked_price(field: &str, amount: Decimal) -> Result<Decimal> {
    Money::price(amount).map(|m| m.amount()).map_err(|e| {
        let reason = match e {
            MoneyError::Negative => "Price cannot be negative".to_string(),
            MoneyError::OutOfRange => format!("Price cannot exceed {}", Money::MAX_AMOUNT),
        };
        AppError::BadRequest(format!("{field}: {reason}"))
    })
}

fn slug_from(source: &str) -> Result<Slug> {
    Slug::from_name(source).ok_or_else(|| AppError::BadRequest("slug: Slug must contain letters or digits".into()))
}

fn required_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("name: Name is required".into()));
    }
    Ok(name.to_string())
}

impl TryFrom<ProductRequest> for ProductInput {
    type Error = AppError;

    fn try_from(r: ProductRequest) -> Result<Self> {
        let price = checked_price("price", r.price)?;
        let compare_at_price = r.compare_at_price.map(|p| checked_price("compareAtPrice", p)).transpose()?;
        let slug = slug_from(r.slug.as_deref().unwrap_or(&r.name))?;
        Ok(Self {
            name: required_name(&r.name)?,
            slug,
            description: r.description,
            price,
            compare_at_price,
            stock: r.stock,
            gender: r.gender,
            featured: r.featured,
            category_id: r.category_id,
            children: ProductChildren { images: r.images, sizes: r.sizes, colors: r.colors, features: r.features },
        })
    }
}

impl TryFrom<UpdateProductRequest> for ProductPatch {
    type Error = AppError;

    fn try_from(r: UpdateProductRequest) -> Result<Self> {
        Ok(Self {
            name: r.name.as_deref().map(required_name).transpose()?,
            slug: r.slug.as_deref().map(slug_from).transpose()?,
            description: r.description,
            price: r.price.map(|p| checked_price("price", p)).transpose()?,
            compare_at_price: r.compare_at_price.map(|p| checked_price("compareAtPrice", p)).transpose()?,
            stock: r.stock,
            gender: r.gender,
            featured: r.featured,
            category_id: r.category_id,
            children: ProductChildren { images: r.images, sizes: r.sizes, colors: r.colors, features: r.features },
        })
    }
}

async fn list_products(State(s): State<AppState>, ApiQuery(p): ApiQuery<ListParams>) -> Result<Json<Paginated<ProductSummary>>> {
    let filter = p.filter()?;
    let page = Page::new(p.page, p.limit, DEFAULT_PAGE_SIZE);
    let (data, total) = ProductRepository::new(&s.db).list(&filter, ProductSort::parse(p.sort.as_deref()), page).await?;
    Ok(Json(Paginated::new(data, total, page)))
}

async fn get_product(State(s): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> Result<Json<ProductDetail>> {
    ProductRepository::new(&s.db).get(id).await?.map(Json).ok_or_else(|| AppError::not_found("Product"))
}

async fn create_product(
    State(s): State<AppState>,
    admin: AdminUser,
    ValidatedJson(r): ValidatedJson<ProductRequest>,
) -> Result<(StatusCode, Json<ProductDetail>)> {
    let input = ProductInput::try_from(r)?;
    let product = ProductRepository::new(&s.db).create(&input).await.map_err(write_error)?;
    tracing::info!(product_id = %product.product.id, actor = admin.actor(), "product created");
    Ok((StatusCode::CREATED, Json(product)))
}

async fn update_product(
    State(s): State<AppState>,
    admin: AdminUser,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(r): ValidatedJson<UpdateProductRequest>,
) -> Result<Json<ProductDetail>> {
    let patch = ProductPatch::try_from(r)?;
    let product = ProductRepository::new(&s.db)
        .update(id, &patch)
        .await
        .map_err(write_error)?
        .ok_or_else(|| AppError::not_found("Product"))?;
    tracing::info!(product_id = %id, actor = admin.actor(), "product updated");
    Ok(Json(product))
}

async fn delete_product(State(s): State<AppState>, admin: AdminUser, ApiPath(id): ApiPath<Uuid>) -> Result<Json<Value>> {
    let deleted = ProductRepository::new(&s.db).delete(id).await.map_err(|e| match e {
        RepositoryError::ForeignKey(_) => AppError::BadRequest("Product is referenced by existing orders".into()),
        other => other.into(),
    })?;
    if !deleted {
        return Err(AppError::not_found("Product"));
    }
    tracing::info!(product_id = %id, actor = admin.actor(), "product deleted");
    Ok(Json(json!({ "message": "Product deleted" })))
}

fn write_error(e: RepositoryError) -> AppError {
    match e {
        RepositoryError::Conflict(_) => AppError::BadRequest("A product with this slug already exists".into()),
        RepositoryError::ForeignKey(_) => AppError::BadRequest("Category not found".into()),
        other => other.into(),
    }
}
