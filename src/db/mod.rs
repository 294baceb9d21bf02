//! Database access over `PostgreSQL`.
//!
//! Each repository borrows the pool and issues runtime-checked `sqlx` queries.
//! Schema lives in `migrations/` and is applied at startup.

pub mod carts;
pub mod categories;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod stats;
pub mod users;
pub mod wishlist;

use std::time::Duration;

use secrecy::ExposeSecret;
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(sqlx::Error),
    #[error("unique constraint violated: {0}")]
    Conflict(String),
    #[error("foreign key violated: {0}")]
    ForeignKey(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            let constraint = db.constraint().unwrap_or_default().to_string();
            match db.code().as_deref() {
                Some(UNIQUE_VIOLATION) => return Self::Conflict(constraint),
                Some(FOREIGN_KEY_VIOLATION) => return Self::ForeignKey(constraint),
                _ => {}
            }
        }
        Self::Database(e)
    }
}

pub type RepoResult<T> = Result<T, RepositoryError>;

pub async fn create_pool(database_url: &secrecy::SecretString, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Offset-based page request. `page` is 1-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page { pub page: u32, pub limit: u32 }

impl Page {
    pub const MAX_LIMIT: u32 = 100;

    pub fn new(page: Option<u32>, limit: Option<u32>, default_limit: u32) -> Self {
        Self { page: page.unwrap_or(1).max(1), limit: limit.unwrap_or(default_limit).clamp(1, Self::MAX_LIMIT) }
    }
    pub fn limit(&self) -> i64 { i64::from(self.limit) }
    pub fn offset(&self) -> i64 { i64::from(self.page - 1) * i64::from(self.limit) }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> { pub data: Vec<T>, pub total: i64, pub page: u32, pub limit: u32, pub total_pages: i64 }

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, total: i64, page: Page) -> Self {
        let limit = i64::from(page.limit);
        Self { data, total, page: page.page, limit: page.limit, total_pages: (total + limit - 1) / limit }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_clamps() {
        let p = Page::new(Some(0), Some(500), 12);
        assert_eq!(p, Page { page: 1, limit: 100 });
        assert_eq!(p.offset(), 0);
        let p = Page::new(Some(3), None, 12);
        assert_eq!(p.offset(), 24);
        assert_eq!(Page::new(None, Some(0), 12).limit, 1);
    }

    #[test]
    fn test_total_pages() {
        let page = Page::new(Some(1), Some(10), 10);
        assert_eq!(Paginated::<()>::new(vec![], 0, page).total_pages, 0);
        assert_eq!(Paginated::<()>::new(vec![], 10, page).total_pages, 1);
        assert_eq!(Paginated::<()>::new(vec![], 11, page).total_pages, 2);
    }
}
