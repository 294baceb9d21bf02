//! Cart Aggregate
//!
//! Lines are identified by product, size and colour. Adding a line that matches
//! an existing one increases its quantity instead of creating a second line,
//! capped at the per-line order limit.

use serde::Serialize;
use uuid::Uuid;
use crate::domain::aggregates::NewOrder;
use crate::domain::value_objects::Money;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    user_id: Uuid,
    items: Vec<CartItem>,
    subtotal: Money,
    item_count: u32,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub image_url: Option<String>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub quantity: u32,
    pub unit_price: Money,
    pub stock: i32,
}

impl CartItem {
    /// Prices come from the catalog, so this stays far below `Decimal::MAX`.
    pub fn line_total(&self) -> Money { self.unit_price.saturating_multiply(self.quantity) }

    pub fn same_line(&self, product_id: Uuid, size: Option<&str>, color: Option<&str>) -> bool {
        self.product_id == product_id && self.size.as_deref() == size && self.color.as_deref() == color
    }
}

impl Cart {
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id, items: vec![], subtotal: Money::ZERO, item_count: 0 }
    }

    pub fn with_items(user_id: Uuid, items: impl IntoIterator<Item = CartItem>) -> Self {
        let mut cart = Self::new(user_id);
        for item in items { cart.add_item(item); }
        cart
    }

    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn subtotal(&self) -> &Money { &self.subtotal }
    /// Total units across all lines.
    pub fn item_count(&self) -> u32 { self.item_count }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    pub fn add_item(&mut self, mut item: CartItem) {
        if item.quantity == 0 { return; }
        if let Some(existing) = self.items.iter_mut().find(|i| i.same_line(item.product_id, item.size.as_deref(), item.color.as_deref())) {
            existing.quantity = existing.quantity.saturating_add(item.quantity).min(NewOrder::MAX_QUANTITY);
        } else {
            item.quantity = item.quantity.min(NewOrder::MAX_QUANTITY);
            self.items.push(item);
        }
        self.recalculate();
    }

    pub fn update_quantity(&mut self, item_id: Uuid, quantity: u32) -> Result<(), CartError> {
        let item = self.items.iter_mut().find(|i| i.id == item_id).ok_or(CartError::ItemNotFound)?;
        if quantity == 0 { self.items.retain(|i| i.id != item_id); }
        else { item.quantity = quantity; }
        self.recalculate();
        Ok(())
    }

    pub fn remove_item(&mut self, item_id: Uuid) -> Result<(), CartError> {
        let before = self.items.len();
        self.items.retain(|i| i.id != item_id);
        if self.items.len() == before { return Err(CartError::ItemNotFound); }
        self.recalculate();
        Ok(())
    }

    fn recalculate(&mut self) {
        self.subtotal = self.items.iter().fold(Money::ZERO, |acc, i| acc.saturating_add(&i.line_total()));
        self.item_count = self.items.iter().map(|i| i.quantity).sum();
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum CartError {
    #[error("Cart item not found")]
    ItemNotFound,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn item(product_id: Uuid, size: Option<&str>, quantity: u32) -> CartItem {
        CartItem {
            id: Uuid::new_v4(), product_id, name: "Linen Shirt".into(), image_url: None,
            size: size.map(String::from), color: Some("white".into()), quantity,
            unit_price: Money::new(Decimal::new(2500, 2)), stock: 10,
        }
    }

    #[test]
    fn test_cart_merges_same_line() {
        let p1 = Uuid::new_v4();
        let mut cart = Cart::new(Uuid::new_v4());
        cart.add_item(item(p1, Some("M"), 2));
        cart.add_item(item(p1, Some("M"), 1));
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 3);
        assert_eq!(cart.subtotal().amount(), Decimal::new(7500, 2));
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_cart_keeps_sizes_apart() {
        let p1 = Uuid::new_v4();
        let cart = Cart::with_items(Uuid::new_v4(), [item(p1, Some("M"), 1), item(p1, Some("L"), 1), item(p1, None, 1)]);
        assert_eq!(cart.items().len(), 3);
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_cart_update_and_remove() {
        let mut cart = Cart::new(Uuid::new_v4());
        let line = item(Uuid::new_v4(), None, 1);
        let id = line.id;
        cart.add_item(line);
        cart.update_quantity(id, 4).unwrap();
        assert_eq!(cart.item_count(), 4);
        cart.update_quantity(id, 0).unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.remove_item(id), Err(CartError::ItemNotFound));
        assert_eq!(cart.subtotal().amount(), Decimal::ZERO);
    }

    #[test]
    fn test_zero_quantity_is_ignored() {
        let mut cart = Cart::new(Uuid::new_v4());
        cart.add_item(item(Uuid::new_v4(), None, 0));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_merged_line_capped_at_order_limit() {
        let p1 = Uuid::new_v4();
        let cart = Cart::with_items(Uuid::new_v4(), [item(p1, Some("M"), 1000), item(p1, Some("M"), 1000)]);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, NewOrder::MAX_QUANTITY);
        let cart = Cart::with_items(Uuid::new_v4(), [item(p1, None, 5000)]);
        assert_eq!(cart.item_count(), NewOrder::MAX_QUANTITY);
    }
}
