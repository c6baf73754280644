//! Omoide Uriba Admin library.
//!
//! Back-office JSON API: catalog editing, restocking, order status, user
//! roles, the contact inbox and image upload URLs.
//!
//! # Security
//!
//! Every route except login requires a session whose user still holds the
//! ADMIN role. Bind this binary to a private interface.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod validation;
