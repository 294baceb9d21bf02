//! Request extractors for authenticated and admin-only handlers.
//!
//! ```rust,ignore
//! async fn handler(AdminUser(admin): AdminUser, ...) -> Result<...> { ... }
//! ```
//!
//! Put these before body extractors so unauthenticated requests are rejected
//! before the body is parsed.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use cookie::Cookie;
use uuid::Uuid;

use super::simple_admin::ADMIN_PASSWORD_HEADER;
use super::{AuthError, Claims, TOKEN_COOKIE};
use crate::error::AppError;
use crate::state::AppState;

/// A request carrying a valid session token. Rejects with 401 otherwise.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn id(&self) -> Uuid {
        self.0.sub
    }

    pub fn is_admin(&self) -> bool {
        self.0.role.is_admin()
    }

    /// Owner of the resource, or any admin.
    pub fn can_access(&self, owner_id: Uuid) -> bool {
        self.id() == owner_id || self.is_admin()
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = token_from_parts(parts).ok_or(AuthError::MissingToken)?;
        let claims = state.tokens.verify(&token)?;
        Ok(Self(claims))
    }
}

#[derive(Debug, Clone)]
pub enum AdminPrincipal {
    User(Claims),
    SharedPassword,
}

/// An admin, by JWT role or by the shared admin password. 401 without
/// credentials, 403 for a non-admin token.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AdminPrincipal);

impl AdminUser {
    /// Who performed an admin action, for logs.
    pub fn actor(&self) -> &str {
        match &self.0 {
            AdminPrincipal::User(claims) => &claims.email,
            AdminPrincipal::SharedPassword => "shared-admin-password",
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(candidate) = parts.headers.get(ADMIN_PASSWORD_HEADER).and_then(|v| v.to_str().ok()) {
            if state.simple_admin.check(candidate).is_ok() {
                return Ok(Self(AdminPrincipal::SharedPassword));
            }
            tracing::warn!("rejected admin password header");
        }

        let AuthUser(claims) = AuthUser::from_request_parts(parts, state).await?;
        if !claims.role.is_admin() {
            tracing::warn!(user_id = %claims.sub, path = %parts.uri.path(), "non-admin denied");
            return Err(AuthError::Forbidden.into());
        }
        Ok(Self(AdminPrincipal::User(claims)))
    }
}

/// Bearer header first, then the `token` cookie.
fn token_from_parts(parts: &Parts) -> Option<String> {
    let bearer = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|c| c.name() == TOKEN_COOKIE && !c.value_trimmed().is_empty())
        .map(|c| c.value_trimmed().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/api/orders");
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_preferred_over_cookie() {
        let p = parts(&[("authorization", "Bearer abc.def.ghi"), ("cookie", "token=zzz")]);
        assert_eq!(token_from_parts(&p).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_cookie_token() {
        let p = parts(&[("cookie", "theme=dark; token=abc.def.ghi; lang=en")]);
        assert_eq!(token_from_parts(&p).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_quoted_cookie_token() {
        let p = parts(&[("cookie", "token=\"abc.def.ghi\"")]);
        assert_eq!(token_from_parts(&p).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_no_token() {
        assert_eq!(token_from_parts(&parts(&[])), None);
        assert_eq!(token_from_parts(&parts(&[("authorization", "Basic dXNlcjpwdw==")])), None);
        assert_eq!(token_from_parts(&parts(&[("cookie", "token=")])), None);
    }
}
