//! Authentication tests - covers password hashing, user accounts, tokens and admin seeding.
//!
//! Tests the authentication layer at the model level:
//! - Password hashing with argon2
//! - Password verification (correct and incorrect)
//! - User creation with hashed passwords and case-insensitive email lookup
//! - Token issue/validation round trip with the stored user

mod common;

use pollvote::auth::password;
use pollvote::db;
use pollvote::errors::is_unique_violation;
use pollvote::models::user::{self, NewUser, Role};
use common::*;

const TEST_NAME: &str = "Test User";
const TEST_EMAIL: &str = "test@example.com";

#[test]
fn test_hash_password_success() {
    let hash = password::hash_password(TEST_PASSWORD)
        .expect("Failed to hash password");

    assert!(!hash.is_empty());
    assert!(hash.starts_with("$argon2"));
}

#[test]
fn test_verify_password_incorrect() {
    let hash = password::hash_password(TEST_PASSWORD)
        .expect("Failed to hash password");

    let verified = password::verify_password("wrongpassword", &hash)
        .expect("Verification failed");

    assert!(!verified);
}

#[test]
fn test_hash_password_randomness() {
    let hash1 = password::hash_password(TEST_PASSWORD)
        .expect("Failed to hash first password");
    let hash2 = password::hash_password(TEST_PASSWORD)
        .expect("Failed to hash second password");

    // Same password should produce different hashes (different salts)
    assert_ne!(hash1, hash2);
    assert!(password::verify_password(TEST_PASSWORD, &hash1).expect("Verification 1 failed"));
    assert!(password::verify_password(TEST_PASSWORD, &hash2).expect("Verification 2 failed"));
}

#[actix_rt::test]
async fn test_create_user_success() {
    let (_dir, pool) = setup_test_db().await;

    let new_user = NewUser {
        name: TEST_NAME.to_string(),
        email: TEST_EMAIL.to_string(),
        password: password::hash_password(TEST_PASSWORD).expect("Failed to hash password"),
        role: Role::User,
    };
    let id = user::create(&pool, &new_user)
        .await
        .expect("Failed to create user");

    let stored = user::find_by_id(&pool, id)
        .await
        .expect("Query failed")
        .expect("User not found");
    assert_eq!(stored.name, TEST_NAME);
    assert_eq!(stored.role, Role::User);
    assert_ne!(stored.password, TEST_PASSWORD);
    assert!(password::verify_password(TEST_PASSWORD, &stored.password).unwrap());
}

#[actix_rt::test]
async fn test_find_by_email_ignores_case() {
    let (_dir, pool) = setup_test_db().await;
    let created = create_user(&pool, TEST_NAME, TEST_EMAIL, Role::User).await;

    let found = user::find_by_email(&pool, "TEST@Example.com")
        .await
        .expect("Query failed")
        .expect("User not found");
    assert_eq!(found.id, created.id);
    assert!(user::email_exists(&pool, "test@EXAMPLE.com").await.unwrap());
    assert!(!user::email_exists(&pool, "nobody@example.com").await.unwrap());
}

#[actix_rt::test]
async fn test_duplicate_email_is_unique_violation() {
    let (_dir, pool) = setup_test_db().await;
    create_user(&pool, TEST_NAME, TEST_EMAIL, Role::User).await;

    let duplicate = NewUser {
        name: "Someone Else".to_string(),
        email: "Test@Example.com".to_string(),
        password: "x".to_string(),
        role: Role::User,
    };
    let err = user::create(&pool, &duplicate)
        .await
        .expect_err("Duplicate email should fail");
    assert!(is_unique_violation(&err));
}

#[actix_rt::test]
async fn test_token_identifies_stored_user() {
    let (_dir, pool) = setup_test_db().await;
    let created = create_voter(&pool).await;

    let claims = keys()
        .validate(&token_for(&created))
        .expect("Token should validate");
    let id = claims.user_id().expect("Numeric subject");
    let loaded = user::find_by_id(&pool, id).await.unwrap().unwrap();
    assert_eq!(loaded.email, USER_EMAIL);
}

#[actix_rt::test]
async fn test_seed_admin_runs_once() {
    let (_dir, pool) = setup_test_db().await;
    let hash = password::hash_password(TEST_PASSWORD).unwrap();

    assert!(db::seed_admin(&pool, "Root", "root@example.com", &hash).await.unwrap());
    assert!(!db::seed_admin(&pool, "Root", "root@example.com", &hash).await.unwrap());

    let admin = user::find_by_email(&pool, "root@example.com").await.unwrap().unwrap();
    assert_eq!(admin.role, Role::Admin);
}
