//! Value Objects for the storefront

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Money in the shop's single currency. Stored as NUMERIC(12,2), so any amount
/// that is persisted must stay within [`Money::MAX_AMOUNT`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);
    /// 9_999_999_999.99
    pub const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

    pub fn new(amount: Decimal) -> Self { Self(amount) }

    /// A price as submitted by a client: non-negative and storable.
    pub fn price(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() { return Err(MoneyError::Negative); }
        Self(amount).storable()
    }

    pub fn amount(&self) -> Decimal { self.0 }

    pub fn storable(self) -> Result<Self, MoneyError> {
        if self.0 > Self::MAX_AMOUNT { Err(MoneyError::OutOfRange) } else { Ok(self) }
    }

    pub fn checked_add(&self, other: &Money) -> Result<Money, MoneyError> {
        self.0.checked_add(other.0).map(Money).ok_or(MoneyError::OutOfRange)
    }

    pub fn checked_multiply(&self, qty: u32) -> Result<Money, MoneyError> {
        self.0.checked_mul(Decimal::from(qty)).map(Money).ok_or(MoneyError::OutOfRange)
    }

    /// For display-only totals built from stored prices.
    pub fn saturating_add(&self, other: &Money) -> Money { Money(self.0.saturating_add(other.0)) }
    pub fn saturating_multiply(&self, qty: u32) -> Money { Money(self.0.saturating_mul(Decimal::from(qty))) }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("amount cannot be negative")]
    Negative,
    #[error("amount exceeds 9999999999.99")]
    OutOfRange,
}

/// Errors that can occur when parsing an [`Email`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EmailError {
    #[error("email cannot be empty")]
    Empty,
    #[error("email must be at most {max} characters")]
    TooLong { max: usize },
    #[error("email must contain a single @ symbol")]
    MissingAtSymbol,
    #[error("email local part cannot be empty")]
    EmptyLocalPart,
    #[error("email domain must contain a dot")]
    InvalidDomain,
}

/// Normalized (trimmed, lowercased) email address.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    pub const MAX_LENGTH: usize = 254;

    pub fn parse(s: &str) -> Result<Self, EmailError> {
        let s = s.trim().to_lowercase();
        if s.is_empty() { return Err(EmailError::Empty); }
        if s.len() > Self::MAX_LENGTH { return Err(EmailError::TooLong { max: Self::MAX_LENGTH }); }
        let (local, domain) = s.split_once('@').ok_or(EmailError::MissingAtSymbol)?;
        if domain.contains('@') { return Err(EmailError::MissingAtSymbol); }
        if local.is_empty() { return Err(EmailError::EmptyLocalPart); }
        if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
            return Err(EmailError::InvalidDomain);
        }
        Ok(Self(s))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// URL slug derived from a display name: lowercase ASCII alphanumerics separated by single dashes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    pub fn from_name(name: &str) -> Option<Self> {
        let mut out = String::with_capacity(name.len());
        for c in name.trim().chars() {
            if c.is_ascii_alphanumeric() {
                out.push(c.to_ascii_lowercase());
            } else if !out.is_empty() && !out.ends_with('-') {
                out.push('-');
            }
        }
        while out.ends_with('-') { out.pop(); }
        if out.is_empty() { None } else { Some(Self(out)) }
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// Review rating, 1 to 5 stars.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: i32 = 1;
    pub const MAX: i32 = 5;
}

impl TryFrom<i32> for Rating {
    type Error = RatingError;
    fn try_from(v: i32) -> Result<Self, Self::Error> {
        if (Self::MIN..=Self::MAX).contains(&v) { Ok(Self(v as u8)) } else { Err(RatingError::OutOfRange(v)) }
    }
}

impl From<Rating> for i32 { fn from(r: Rating) -> i32 { i32::from(r.0) } }

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RatingError {
    #[error("rating must be between 1 and 5, got {0}")]
    OutOfRange(i32),
}
