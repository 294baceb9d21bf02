//! Storefront API
//!
//! REST backend for a clothing storefront and its admin back-office.
//!
//! ## Features
//! - Product catalog with filtering, sorting and pagination
//! - Categories, reviews and per-user wishlists
//! - Server-side cart with line merging
//! - Order placement and admin status management
//! - JWT sessions (cookie or bearer) plus an optional shared admin password
//! - Domain events published to NATS

pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod events;
pub mod extract;
pub mod routes;
pub mod state;

pub use config::Config;
pub use error::AppError;
pub use state::AppState;
