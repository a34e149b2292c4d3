use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::from_millis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }

    pub fn from_db(value: &str) -> Self {
        match value {
            "ADMIN" => Role::Admin,
            "USER" => Role::User,
            other => {
                log::warn!("Unknown role '{other}' in users table, treating as USER");
                Role::User
            }
        }
    }

    /// Role derived from an email address: anything containing "admin"
    /// (case-insensitive) is ADMIN.
    ///
    /// The server applies this once, at signup. Clients may show it as a
    /// hint while the form is being filled in, but the role in the stored
    /// account is the only one that grants anything.
    pub fn hint_for_email(email: &str) -> Self {
        if email.to_lowercase().contains("admin") {
            Role::Admin
        } else {
            Role::User
        }
    }

    pub fn is_admin(self) -> bool {
        self == Role::Admin
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Internal user record for authentication - includes the password hash.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UserRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub created_at: i64,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            name: row.name,
            email: row.email,
            password: row.password,
            role: Role::from_db(&row.role),
            created_at: from_millis(row.created_at),
        }
    }
}

/// New user data for creation. `password` is already hashed.
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}
