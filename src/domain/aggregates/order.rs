//! Order Aggregate
//!
//! Status is a plain enum. Admins may set any status at any time, including
//! moving an order backwards, so there is no transition table here.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;
use crate::domain::value_objects::{Money, MoneyError};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus { #[default] Pending, Confirmed, Processing, Shipped, Delivered, Cancelled }

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [Self::Pending, Self::Confirmed, Self::Processing, Self::Shipped, Self::Delivered, Self::Cancelled];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Processing => "PROCESSING",
            Self::Shipped => "SHIPPED",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for OrderStatus {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|st| st.as_str().eq_ignore_ascii_case(s.trim())).ok_or_else(|| OrderError::UnknownStatus(s.to_string()))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub full_name: String,
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: Option<String>,
    pub city: String,
    #[serde(default)]
    pub state: Option<String>,
    pub postal_code: String,
    pub country: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl ShippingAddress {
    fn check(&self) -> Result<(), OrderError> {
        let required = [
            ("fullName", &self.full_name),
            ("addressLine1", &self.address_line1),
            ("city", &self.city),
            ("postalCode", &self.postal_code),
            ("country", &self.country),
        ];
        match required.into_iter().find(|(_, v)| v.trim().is_empty()) {
            Some((field, _)) => Err(OrderError::MissingAddressField(field)),
            None => Ok(()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineItem { pub product_id: Uuid, pub quantity: u32, pub unit_price: Money, pub size: Option<String>, pub color: Option<String> }

impl LineItem {
    pub fn total(&self) -> Result<Money, MoneyError> { self.unit_price.checked_multiply(self.quantity) }
}

/// An order that has passed validation and is ready to persist.
#[derive(Clone, Debug)]
pub struct NewOrder {
    user_id: Uuid,
    items: Vec<LineItem>,
    shipping_address: ShippingAddress,
    payment_method: Option<String>,
    notes: Option<String>,
    total: Money,
}

impl NewOrder {
    pub const MAX_QUANTITY: u32 = 1000;

    /// Prices come from the submitted lines as-is; stock is neither checked nor reserved.
    pub fn place(user_id: Uuid, items: Vec<LineItem>, shipping_address: ShippingAddress, payment_method: Option<String>, notes: Option<String>) -> Result<Self, OrderError> {
        if items.is_empty() { return Err(OrderError::NoItems); }
        if items.iter().any(|i| i.quantity == 0 || i.quantity > Self::MAX_QUANTITY) { return Err(OrderError::InvalidQuantity); }
        for item in &items { Money::price(item.unit_price.amount())?; }
        shipping_address.check()?;
        let total = items.iter().try_fold(Money::ZERO, |acc, i| acc.checked_add(&i.total()?))?.storable()?;
        Ok(Self { user_id, items, shipping_address, payment_method, notes, total })
    }

    pub fn user_id(&self) -> Uuid { self.user_id }
    pub fn items(&self) -> &[LineItem] { &self.items }
    pub fn shipping_address(&self) -> &ShippingAddress { &self.shipping_address }
    pub fn payment_method(&self) -> Option<&str> { self.payment_method.as_deref() }
    pub fn notes(&self) -> Option<&str> { self.notes.as_deref() }
    pub fn total(&self) -> &Money { &self.total }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum OrderError {
    #[error("Order must contain at least one item")]
    NoItems,
    #[error("Item quantity must be between 1 and 1000")]
    InvalidQuantity,
    #[error("Item price cannot be negative")]
    NegativePrice,
    #[error("Order amount exceeds the maximum allowed")]
    AmountOutOfRange,
    #[error("Shipping address is missing {0}")]
    MissingAddressField(&'static str),
    #[error("Invalid order status: {0}")]
    UnknownStatus(String),
}

impl From<MoneyError> for OrderError {
    fn from(e: MoneyError) -> Self {
        match e {
            MoneyError::Negative => Self::NegativePrice,
            MoneyError::OutOfRange => Self::AmountOutOfRange,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Ada Lovelace".into(), address_line1: "12 St James's Square".into(), address_line2: None,
            city: "London".into(), state: None, postal_code: "SW1Y 4JH".into(), country: "GB".into(), phone: None,
        }
    }

    fn line(qty: u32, cents: i64) -> LineItem {
        LineItem { product_id: Uuid::new_v4(), quantity: qty, unit_price: Money::new(Decimal::new(cents, 2)), size: None, color: None }
    }

    #[test]
    fn test_order_total() {
        let order = NewOrder::place(Uuid::new_v4(), vec![line(2, 1000), line(1, 499)], address(), Some("card".into()), None).unwrap();
        assert_eq!(order.total().amount(), Decimal::new(2499, 2));
        assert_eq!(order.items().len(), 2);
    }

    #[test]
    fn test_order_rejects_bad_input() {
        let uid = Uuid::new_v4();
        assert_eq!(NewOrder::place(uid, vec![], address(), None, None).unwrap_err(), OrderError::NoItems);
        assert_eq!(NewOrder::place(uid, vec![line(0, 100)], address(), None, None).unwrap_err(), OrderError::InvalidQuantity);
        assert_eq!(NewOrder::place(uid, vec![line(1001, 100)], address(), None, None).unwrap_err(), OrderError::InvalidQuantity);
        assert_eq!(NewOrder::place(uid, vec![line(1, -100)], address(), None, None).unwrap_err(), OrderError::NegativePrice);
        let mut addr = address();
        addr.city = " ".into();
        assert_eq!(NewOrder::place(uid, vec![line(1, 100)], addr, None, None).unwrap_err(), OrderError::MissingAddressField("city"));
    }

    #[test]
    fn test_order_amount_limits() {
        let uid = Uuid::new_v4();
        let mut huge = line(2, 0);
        huge.unit_price = Money::new(Decimal::MAX);
        assert_eq!(NewOrder::place(uid, vec![huge], address(), None, None).unwrap_err(), OrderError::AmountOutOfRange);

        let mut at_max = line(1, 0);
        at_max.unit_price = Money::new(Money::MAX_AMOUNT);
        assert!(NewOrder::place(uid, vec![at_max.clone()], address(), None, None).is_ok());
        at_max.quantity = 2;
        assert_eq!(NewOrder::place(uid, vec![at_max], address(), None, None).unwrap_err(), OrderError::AmountOutOfRange);
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("shipped".parse::<OrderStatus>().unwrap(), OrderStatus::Shipped);
        assert_eq!("CANCELLED".parse::<OrderStatus>().unwrap(), OrderStatus::Cancelled);
        assert!("LOST".parse::<OrderStatus>().is_err());
        assert_eq!(serde_json::to_string(&OrderStatus::Processing).unwrap(), "\"PROCESSING\"");
    }
}
