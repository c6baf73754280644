//! Administrator role commands.
//!
//! Accounts are created through storefront signup; these commands only
//! change roles.

use omoide_admin::db::UserRepository;
use omoide_core::Email;

use super::{CliError, connect};

/// Grant ADMIN to `email`, or to the oldest account when `first` is set.
///
/// # Errors
///
/// Returns an error for a malformed email, an unknown account or a
/// database failure.
pub async fn promote(email: Option<&str>, first: bool) -> Result<(), CliError> {
    let email = email
        .map(|e| Email::parse(e).map_err(|_| CliError::InvalidEmail(e.to_owned())))
        .transpose()?;

    let pool = connect().await?;
    let users = UserRepository::new(&pool);

    match email {
        Some(email) if !first => {
            if !users.promote(&email).await? {
                return Err(CliError::UserNotFound(email.to_string()));
            }
            tracing::info!("Granted ADMIN to {email}");
        }
        _ => {
            let email = users
                .promote_first()
                .await?
                .ok_or_else(|| CliError::UserNotFound("no accounts exist".to_owned()))?;
            tracing::info!("Granted ADMIN to the first account: {email}");
        }
    }
    Ok(())
}

/// Print every account with its role.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn list() -> Result<(), CliError> {
    let pool = connect().await?;
    let users = UserRepository::new(&pool).list().await?;

    tracing::info!("{} account(s)", users.len());
    for user in users {
        tracing::info!(
            "  #{} {} {} ({} orders)",
            user.id,
            user.role,
            user.email,
            user.order_count
        );
    }
    Ok(())
}
