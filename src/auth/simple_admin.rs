//! Shared admin password, accepted alongside admin JWTs.
//!
//! Disabled unless `ADMIN_PASSWORD` is set. It grants admin access without a
//! user account, so it is independent of the role stored on users.

use secrecy::{ExposeSecret, SecretString};

use super::AuthError;

pub const ADMIN_PASSWORD_HEADER: &str = "x-admin-password";

#[derive(Clone, Default)]
pub struct SimpleAdmin {
    password: Option<SecretString>,
}

impl SimpleAdmin {
    pub fn new(password: Option<SecretString>) -> Self {
        Self { password }
    }

    pub fn is_enabled(&self) -> bool {
        self.password.is_some()
    }

    pub fn check(&self, candidate: &str) -> Result<(), AuthError> {
        let Some(expected) = &self.password else {
            return Err(AuthError::SimpleAdminDisabled);
        };
        if constant_time_compare(expected.expose_secret(), candidate) {
            Ok(())
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_without_password() {
        let guard = SimpleAdmin::default();
        assert!(!guard.is_enabled());
        assert!(matches!(guard.check("anything"), Err(AuthError::SimpleAdminDisabled)));
    }

    #[test]
    fn test_password_check() {
        let guard = SimpleAdmin::new(Some(SecretString::from("open-sesame".to_string())));
        assert!(guard.check("open-sesame").is_ok());
        assert!(matches!(guard.check("open-sesam"), Err(AuthError::InvalidCredentials)));
        assert!(matches!(guard.check("open-sesamf"), Err(AuthError::InvalidCredentials)));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("", ""));
        assert!(!constant_time_compare("hello", "hell"));
        assert!(!constant_time_compare("hello", "world"));
    }
}
