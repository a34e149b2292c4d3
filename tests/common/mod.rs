//! Shared test infrastructure.
//!
//! # Test Database Setup
//! - `setup_test_db()` - temporary SQLite file with the schema applied
//! - `spawn_app()` - the full API served on an ephemeral local port
#![allow(dead_code)]

use std::net::TcpListener;

use actix_web::{App, HttpServer, web};
use chrono::{Duration, Utc};
use tempfile::TempDir;

use pollvote::auth::password;
use pollvote::auth::rate_limit::RateLimiter;
use pollvote::auth::token::TokenKeys;
use pollvote::db::{self, DbPool};
use pollvote::handlers;
use pollvote::models::poll::{self, NewPoll};
use pollvote::models::user::{self, NewUser, Role, User};

// ============================================================================
// TEST CONSTANTS
// ============================================================================

pub const TEST_SECRET: &str = "integration-test-secret-that-is-long-enough";
pub const TEST_PASSWORD: &str = "password123";
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const USER_EMAIL: &str = "alice@example.com";

// ============================================================================
// DATABASE SETUP
// ============================================================================

/// Create a temporary SQLite database and run migrations.
///
/// The returned TempDir must be kept alive for the pool to remain valid.
pub async fn setup_test_db() -> (TempDir, DbPool) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let url = format!("sqlite://{}", dir.path().join("test.db").display());
    let pool = db::init_pool(&url).await.expect("Failed to open test DB");
    db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    (dir, pool)
}

pub fn keys() -> TokenKeys {
    TokenKeys::new(TEST_SECRET, Duration::hours(1))
}

/// Insert an account whose password is `TEST_PASSWORD`.
pub async fn create_user(pool: &DbPool, name: &str, email: &str, role: Role) -> User {
    let new_user = NewUser {
        name: name.to_string(),
        email: email.to_string(),
        password: password::hash_password(TEST_PASSWORD).expect("Failed to hash password"),
        role,
    };
    let id = user::create(pool, &new_user)
        .await
        .expect("Failed to create user");
    user::find_by_id(pool, id)
        .await
        .expect("Failed to load user")
        .expect("User missing after insert")
}

pub async fn create_admin(pool: &DbPool) -> User {
    create_user(pool, "Admin", ADMIN_EMAIL, Role::Admin).await
}

pub async fn create_voter(pool: &DbPool) -> User {
    create_user(pool, "Alice", USER_EMAIL, Role::User).await
}

pub fn token_for(user: &User) -> String {
    keys()
        .issue(user.id, &user.email)
        .expect("Failed to issue token")
}

/// Insert a poll closing `closes_in` from now.
pub async fn create_poll(
    pool: &DbPool,
    admin: &User,
    question: &str,
    options: &[&str],
    closes_in: Duration,
) -> i64 {
    let new_poll = NewPoll {
        question: question.to_string(),
        options: options.iter().map(|o| o.to_string()).collect(),
        closes_at: Utc::now() + closes_in,
        created_by: admin.id,
    };
    poll::create(pool, &new_poll)
        .await
        .expect("Failed to create poll")
}

// ============================================================================
// IN-PROCESS SERVER
// ============================================================================

pub struct TestApp {
    /// Base URL including the `/api` prefix.
    pub base_url: String,
    pub pool: DbPool,
    _dir: TempDir,
}

/// Serve the API on 127.0.0.1 with an OS-assigned port.
pub async fn spawn_app() -> TestApp {
    let (dir, pool) = setup_test_db().await;
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind test port");
    let port = listener
        .local_addr()
        .expect("Failed to read local addr")
        .port();

    let pool_data = web::Data::new(pool.clone());
    let key_data = web::Data::new(keys());
    let limiter = web::Data::new(RateLimiter::new());

    let server = HttpServer::new(move || {
        App::new()
            .app_data(pool_data.clone())
            .app_data(key_data.clone())
            .app_data(limiter.clone())
            .configure(handlers::configure)
            .default_service(web::to(handlers::not_found))
    })
    .workers(1)
    .listen(listener)
    .expect("Failed to listen")
    .run();
    actix_rt::spawn(server);

    TestApp {
        base_url: format!("http://127.0.0.1:{port}/api"),
        pool,
        _dir: dir,
    }
}
