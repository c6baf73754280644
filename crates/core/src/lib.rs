//! Omoide Core - Shared types and order-placement rules.
//!
//! This crate provides the domain vocabulary used across all Omoide Uriba
//! components:
//! - `storefront` - Public-facing shop API
//! - `admin` - Role-gated back-office API
//! - `cli` - Command-line tools for migrations and operator tasks
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. The pieces of the checkout path that can be decided
//! without touching the database (re-pricing a cart, normalising a reservation
//! batch, judging whether an order may move to a new status) live here so both
//! binaries apply the same rules.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, money, emails, and statuses
//! - [`pricing`] - Server-side quotes and client total verification
//! - [`inventory`] - Reservation plans and stock level classification

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod inventory;
pub mod pricing;
pub mod types;

pub use types::*;
