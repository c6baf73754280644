//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Password accounts (Argon2id)
//! - `checkout` - Pricing, payment capture and the stock-reserving order transaction
//! - `email` - Contact form mail (SMTP)

pub mod auth;
pub mod checkout;
pub mod email;

pub use auth::{AuthError, AuthService};
pub use checkout::{CheckoutError, CheckoutService, PreparedPayment};
pub use email::{EmailError, EmailService};
