//! Domain models for the storefront.
//!
//! Row-shaped structs derive `sqlx::FromRow` and `Serialize` directly; the
//! JSON API returns them as-is in camelCase.

pub mod catalog;
pub mod contact;
pub mod order;
pub mod session;
pub mod user;

pub use catalog::{Category, CategorySummary, Product};
pub use contact::NewContact;
pub use order::{NewOrder, NewOrderItem, Order, OrderItem, ShippingAddress};
pub use session::{CurrentUser, keys as session_keys};
pub use user::{Profile, User};
