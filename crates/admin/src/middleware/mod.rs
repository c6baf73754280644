//! HTTP middleware for admin.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Response headers (`nosniff`, `DENY`, `no-store`)
//! 4. Session layer (tower-sessions with `PostgreSQL` store)
//!
//! Route handlers opt in to authentication with [`RequireAdmin`].

pub mod auth;
pub mod session;

pub use auth::{RequireAdmin, clear_current_admin, set_current_admin};
pub use session::create_session_layer;
