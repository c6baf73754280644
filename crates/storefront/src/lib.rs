//! Omoide Uriba Storefront library.
//!
//! Public JSON API for the shop: catalog, stock check, checkout, orders,
//! contact form and shopper accounts. The binary in `main.rs` wires these
//! modules into an axum server; integration tests use them directly.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod paypal;
pub mod routes;
pub mod services;
pub mod state;
pub mod validation;
