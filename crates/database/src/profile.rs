//! Profile storage for how the coach addresses a user.

use sqlx::SqlitePool;

use crate::models::Profile;
use crate::Result;

/// Profile field identifiers for updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileField {
    /// Name the coach uses.
    DisplayName,
    /// Companion persona key.
    CompanionType,
}

impl ProfileField {
    /// Get the database column name for this field.
    pub fn column_name(&self) -> &'static str {
        match self {
            ProfileField::DisplayName => "display_name",
            ProfileField::CompanionType => "companion_type",
        }
    }
}

/// Get a user's profile.
pub async fn get_profile(pool: &SqlitePool, user_id: &str) -> Result<Option<Profile>> {
    let record = sqlx::query_as::<_, Profile>(
        r#"
        SELECT user_id, display_name, companion_type, created_at, updated_at
        FROM profiles
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

/// Update a single field in a user's profile.
///
/// Creates the profile if it doesn't exist.
/// If value is None, clears the field.
pub async fn upsert_profile_field(
    pool: &SqlitePool,
    user_id: &str,
    field: ProfileField,
    value: Option<&str>,
) -> Result<()> {
    // Column names cannot be bound; the name comes from the ProfileField enum.
    let column = field.column_name();
    let query = format!(
        r#"
        INSERT INTO profiles (user_id, {column})
        VALUES (?, ?)
        ON CONFLICT(user_id) DO UPDATE SET
            {column} = excluded.{column},
            updated_at = datetime('now')
        "#,
        column = column
    );

    sqlx::query(&query)
        .bind(user_id)
        .bind(value)
        .execute(pool)
        .await?;

    Ok(())
}
