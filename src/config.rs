use std::{env, fmt::Display, str::FromStr, time::Duration};

use rand::Rng;

pub const DEFAULT_BIND: &str = "127.0.0.1:8080";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/pollvote.db";

/// Administrator account created at startup when all three variables are set.
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub database_url: String,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    pub expiry_sweep: Duration,
    pub admin_seed: Option<AdminSeed>,
}

impl ServerConfig {
    /// Read configuration from the environment (after `.env`, if present).
    pub fn load() -> Self {
        let token_ttl_hours: i64 = try_load("TOKEN_TTL_HOURS", "24");
        let sweep_secs: u64 = try_load("EXPIRY_SWEEP_SECS", "60");
        Self {
            bind: try_load("POLLVOTE_BIND", DEFAULT_BIND),
            database_url: try_load("DATABASE_URL", DEFAULT_DATABASE_URL),
            jwt_secret: load_jwt_secret(),
            token_ttl: chrono::Duration::hours(token_ttl_hours.max(1)),
            expiry_sweep: Duration::from_secs(sweep_secs.max(1)),
            admin_seed: load_admin_seed(),
        }
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        log::debug!("{key} not set, using default: {default}");
        default.to_string()
    });
    match raw.parse() {
        Ok(value) => value,
        Err(e) => {
            log::warn!("Invalid {key} value '{raw}': {e}; using default: {default}");
            default
                .parse()
                .unwrap_or_else(|_| panic!("default for {key} must parse"))
        }
    }
}

fn load_jwt_secret() -> String {
    match env::var("JWT_SECRET") {
        Ok(val) if val.len() >= 32 => {
            log::info!("Using JWT_SECRET from environment");
            val
        }
        Ok(val) => {
            log::warn!(
                "JWT_SECRET too short ({} bytes, need 32+); generating random secret",
                val.len()
            );
            random_secret()
        }
        Err(_) => {
            log::warn!("No JWT_SECRET set; generating random secret (tokens invalid after restart)");
            random_secret()
        }
    }
}

fn random_secret() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    hex::encode(bytes)
}

fn load_admin_seed() -> Option<AdminSeed> {
    let email = env::var("ADMIN_EMAIL").ok()?;
    let password = match env::var("ADMIN_PASSWORD") {
        Ok(p) => p,
        Err(_) => {
            log::warn!("ADMIN_EMAIL set without ADMIN_PASSWORD; skipping admin seed");
            return None;
        }
    };
    let name = env::var("ADMIN_NAME").unwrap_or_else(|_| "Administrator".to_string());
    Some(AdminSeed {
        name,
        email,
        password,
    })
}
