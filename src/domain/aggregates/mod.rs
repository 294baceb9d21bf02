//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;
pub mod user;

pub use product::{Gender, ProductError, ProductSort};
pub use order::{LineItem, NewOrder, OrderError, OrderStatus, ShippingAddress};
pub use cart::{Cart, CartError, CartItem};
pub use user::{Role, RoleError};
