use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::models::user::{self, NewUser, Role};

pub type DbPool = SqlitePool;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub const MIGRATIONS: &str = include_str!("schema.sql");

pub async fn init_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);
    SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await
}

pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(MIGRATIONS).execute(pool).await?;
    log::info!("Database migrations complete");
    Ok(())
}

/// Create the directory holding a file-backed SQLite database, if any.
pub fn ensure_parent_dir(database_url: &str) -> std::io::Result<()> {
    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    if path.starts_with(':') || path.contains("mode=memory") {
        return Ok(());
    }
    let path = path.split('?').next().unwrap_or(path);
    match Path::new(path).parent() {
        Some(dir) if !dir.as_os_str().is_empty() => std::fs::create_dir_all(dir),
        _ => Ok(()),
    }
}

/// Seed an administrator account if no user with that email exists yet.
/// Returns true when a new account was created.
pub async fn seed_admin(
    pool: &DbPool,
    name: &str,
    email: &str,
    password_hash: &str,
) -> Result<bool, sqlx::Error> {
    if user::email_exists(pool, email).await? {
        log::info!("Admin account {email} already present, skipping seed");
        return Ok(false);
    }
    let new_user = NewUser {
        name: name.to_string(),
        email: email.to_string(),
        password: password_hash.to_string(),
        role: Role::Admin,
    };
    let id = user::create(pool, &new_user).await?;
    log::info!("Seeded admin account {email} (id={id})");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_urls_need_no_directory() {
        assert!(ensure_parent_dir("sqlite::memory:").is_ok());
        assert!(ensure_parent_dir("sqlite://file:db?mode=memory").is_ok());
    }

    #[test]
    fn file_urls_create_their_directory() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let db_path = dir.path().join("nested").join("polls.db");
        let url = format!("sqlite://{}", db_path.display());
        ensure_parent_dir(&url).expect("create dir");
        assert!(dir.path().join("nested").is_dir());
    }
}
