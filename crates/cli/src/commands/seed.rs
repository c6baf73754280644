//! Seed reference data.

use omoide_admin::db::CategoryRepository;

use super::{CliError, connect};

/// Categories the shop opens with, as `(name, slug)`.
pub const DEFAULT_CATEGORIES: [(&str, &str); 4] = [
    ("おもちゃ", "toy"),
    ("ゲーム", "game"),
    ("CD・レコード", "cd-record"),
    ("フィギュア", "figure"),
];

/// Insert the default categories, renaming any whose slug already exists.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a write fails.
pub async fn categories() -> Result<(), CliError> {
    let pool = connect().await?;
    let written = CategoryRepository::new(&pool)
        .upsert_defaults(&DEFAULT_CATEGORIES)
        .await?;

    tracing::info!("Seeded {written} categories");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_slugs_are_unique_and_lowercase() {
        let mut slugs: Vec<&str> = DEFAULT_CATEGORIES.iter().map(|(_, slug)| *slug).collect();
        assert!(slugs
            .iter()
            .all(|s| s.chars().all(|c| c.is_ascii_lowercase() || c == '-')));
        slugs.sort_unstable();
        slugs.dedup();
        assert_eq!(slugs.len(), DEFAULT_CATEGORIES.len());
    }
}
