use chrono::Utc;
use sqlx::SqlitePool;

use super::types::{NewUser, User, UserRow};
use crate::models::to_millis;

const SELECT_USER: &str = "SELECT id, name, email, password, role, created_at FROM users";

/// Insert a user and return its id. Fails with a UNIQUE violation when the
/// email (case-insensitive) is taken.
pub async fn create(pool: &SqlitePool, new_user: &NewUser) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO users (name, email, password, role, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(new_user.name.trim())
    .bind(new_user.email.trim())
    .bind(&new_user.password)
    .bind(new_user.role.as_str())
    .bind(to_millis(Utc::now()))
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<User>, sqlx::Error> {
    let row: Option<UserRow> = sqlx::query_as(&format!("{SELECT_USER} WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(User::from))
}

/// Find user by email for authentication. Matching ignores case.
pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>, sqlx::Error> {
    let row: Option<UserRow> = sqlx::query_as(&format!("{SELECT_USER} WHERE email = ?"))
        .bind(email.trim())
        .fetch_optional(pool)
        .await?;
    Ok(row.map(User::from))
}

pub async fn email_exists(pool: &SqlitePool, email: &str) -> Result<bool, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = ?")
        .bind(email.trim())
        .fetch_one(pool)
        .await?;
    Ok(row.0 > 0)
}
