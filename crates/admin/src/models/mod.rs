//! Domain models for the back-office.
//!
//! Row structs read the same `shop` schema the storefront writes, with the
//! extra columns only staff see (admin notes, payment references, counts).

pub mod catalog;
pub mod contact;
pub mod order;
pub mod session;
pub mod user;

pub use catalog::{Category, CategoryInput, CategoryWithCount, Product, ProductInput};
pub use contact::{Contact, ContactCounts, ContactUpdate};
pub use order::{OrderCustomer, OrderDetail, OrderItem, OrderSummary};
pub use session::{CurrentAdmin, keys as session_keys};
pub use user::{Credentials, UserSummary};
