//! Authentication errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Wrong email or password. Deliberately does not say which.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Authentication required")]
    MissingToken,

    #[error("Invalid or expired token")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),

    #[error("Admin access required")]
    Forbidden,

    #[error("{0}")]
    WeakPassword(String),

    #[error("Simple admin auth disabled")]
    SimpleAdminDisabled,

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error("Token signing failed: {0}")]
    TokenSigning(#[source] jsonwebtoken::errors::Error),
}
