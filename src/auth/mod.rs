//! Authentication: argon2 password hashes and HS256 session tokens.
//!
//! A token is handed out on register/login both as an httpOnly `token` cookie
//! and in the response body and `X-Auth-Token` header. Requests may present it
//! either as `Authorization: Bearer` or as the cookie.

mod error;
pub mod extract;
pub mod simple_admin;

pub use error::AuthError;
pub use extract::{AdminPrincipal, AdminUser, AuthUser};

use std::sync::LazyLock;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use cookie::{Cookie, SameSite};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::aggregates::Role;

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const TOKEN_COOKIE: &str = "token";
pub const TOKEN_HEADER: &str = "x-auth-token";

/// Session token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Signing and verification keys plus token lifetime.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    cookie_secure: bool,
}

impl TokenKeys {
    pub fn new(secret: &[u8], ttl_hours: i64, cookie_secure: bool) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl: Duration::hours(ttl_hours),
            cookie_secure,
        }
    }

    pub fn issue(&self, user_id: Uuid, email: &str, role: Role) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims { sub: user_id, email: email.to_string(), role, iat: now.timestamp(), exp: (now + self.ttl).timestamp() };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(AuthError::TokenSigning)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(AuthError::InvalidToken)
    }

    /// httpOnly cookie carrying the token.
    pub fn session_cookie(&self, token: &str) -> Cookie<'static> {
        self.cookie(token.to_string(), cookie::time::Duration::seconds(self.ttl.num_seconds()))
    }

    /// Cookie that expires the token cookie.
    pub fn clear_cookie(&self) -> Cookie<'static> {
        self.cookie(String::new(), cookie::time::Duration::ZERO)
    }

    fn cookie(&self, value: String, max_age: cookie::time::Duration) -> Cookie<'static> {
        Cookie::build((TOKEN_COOKIE, value))
            .http_only(true)
            .path("/")
            .same_site(SameSite::Lax)
            .secure(self.cookie_secure)
            .max_age(max_age)
            .build()
    }
}

pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!("Password must be at least {MIN_PASSWORD_LENGTH} characters")));
    }
    Ok(())
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::PasswordHash(e.to_string()))
}

/// Hash checked when a login names an unknown email, so both failure paths pay
/// for one argon2 verification.
static DUMMY_HASH: LazyLock<Option<String>> = LazyLock::new(|| hash_password("no-such-user-password").ok());

/// Computes the dummy hash ahead of the first login.
pub fn prepare_dummy_hash() {
    LazyLock::force(&DUMMY_HASH);
}

/// Always `InvalidCredentials`, after the same work a real mismatch costs.
pub fn reject_unknown_user(password: &str) -> AuthError {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_password(password, hash);
    }
    AuthError::InvalidCredentials
}

pub fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed = PasswordHash::new(hash).map_err(|e| AuthError::PasswordHash(e.to_string()))?;
    Argon2::default().verify_password(password.as_bytes(), &parsed).map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret-that-is-long-enough-for-hs256";

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(verify_password("wrong horse", &hash), Err(AuthError::InvalidCredentials)));
    }

    #[test]
    fn test_unknown_user_rejected_as_bad_credentials() {
        prepare_dummy_hash();
        assert!(DUMMY_HASH.is_some());
        assert!(matches!(reject_unknown_user("no-such-user-password"), AuthError::InvalidCredentials));
    }

    #[test]
    fn test_weak_password() {
        assert!(matches!(validate_password("short"), Err(AuthError::WeakPassword(_))));
        assert!(validate_password("longenough").is_ok());
    }

    #[test]
    fn test_token_claims() {
        let keys = TokenKeys::new(SECRET, 1, false);
        let id = Uuid::new_v4();
        let token = keys.issue(id, "a@b.co", Role::Admin).unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_token_rejected_with_other_secret() {
        let token = TokenKeys::new(SECRET, 1, false).issue(Uuid::new_v4(), "a@b.co", Role::User).unwrap();
        let other = TokenKeys::new(b"a-completely-different-secret-value!!", 1, false);
        assert!(matches!(other.verify(&token), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_expired_token_rejected() {
        let keys = TokenKeys::new(SECRET, -2, false);
        let token = keys.issue(Uuid::new_v4(), "a@b.co", Role::User).unwrap();
        assert!(matches!(keys.verify(&token), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_cookie_attributes() {
        let keys = TokenKeys::new(SECRET, 168, true);
        let session = keys.session_cookie("abc");
        assert_eq!(session.name(), TOKEN_COOKIE);
        assert_eq!(session.value(), "abc");
        assert_eq!(session.http_only(), Some(true));
        assert_eq!(session.same_site(), Some(SameSite::Lax));
        assert_eq!(session.secure(), Some(true));
        assert_eq!(session.max_age(), Some(cookie::time::Duration::seconds(604_800)));
        assert_eq!(keys.clear_cookie().max_age(), Some(cookie::time::Duration::ZERO));
        assert!(keys.clear_cookie().to_string().contains("Max-Age=0"));
    }
}
