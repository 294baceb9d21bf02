//! Shared application state.

use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::simple_admin::SimpleAdmin;
use crate::auth::{self, TokenKeys};
use crate::config::Config;
use crate::events::EventPublisher;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub tokens: Arc<TokenKeys>,
    pub simple_admin: SimpleAdmin,
    pub events: EventPublisher,
}

impl AppState {
    pub fn new(config: &Config, db: PgPool, events: EventPublisher) -> Self {
        auth::prepare_dummy_hash();
        Self {
            db,
            tokens: Arc::new(TokenKeys::new(config.jwt_secret_bytes(), config.jwt_ttl_hours, config.cookie_secure)),
            simple_admin: SimpleAdmin::new(config.admin_password.clone()),
            events,
        }
    }
}
