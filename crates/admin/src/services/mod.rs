//! Business logic services for the back-office.

pub mod auth;
pub mod storage;

pub use auth::{AdminAuthError, AdminAuthService};
pub use storage::{PresignedUpload, StorageError, StorageService};
