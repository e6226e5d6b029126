//! Accounts and sessions
//!
//! Session tokens are random; only their SHA-256 hash is stored, so a
//! leaked database does not leak usable cookies.

use chrono::{Duration, Utc};
use resepi_common::auth::{generate_salt, generate_session_token, hash_password, hash_token, verify_password};
use resepi_common::db::{Role, User};
use resepi_common::{Error, Result};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

pub async fn count_users(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Create an account; the first account becomes admin
///
/// Email uniqueness is case-insensitive; a duplicate is `Conflict`.
pub async fn create_user(pool: &SqlitePool, email: &str, display_name: &str, password: &str) -> Result<User> {
    let guid = Uuid::new_v4().to_string();
    let salt = generate_salt();
    let password_hash = hash_password(password, &salt);

    let mut tx = pool.begin().await?;

    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&mut *tx)
        .await?;
    let role = if existing == 0 { Role::Admin } else { Role::Reader };

    let inserted = sqlx::query(
        r#"
        INSERT INTO users (guid, email, display_name, password_hash, password_salt, role)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&guid)
    .bind(email.trim())
    .bind(display_name.trim())
    .bind(&password_hash)
    .bind(&salt)
    .bind(role)
    .execute(&mut *tx)
    .await;

    match inserted {
        Ok(_) => {}
        Err(e) => {
            let err = Error::from(e);
            if err.is_unique_violation() {
                return Err(Error::Conflict("Email is already registered".to_string()));
            }
            return Err(err);
        }
    }

    tx.commit().await?;

    info!(user_id = %guid, role = %role, "Registered user");

    get_user(pool, &guid)
        .await?
        .ok_or_else(|| Error::Internal(format!("User vanished after insert: {}", guid)))
}

pub async fn get_user(pool: &SqlitePool, guid: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "SELECT guid, email, display_name, role, created_at FROM users WHERE guid = ?",
    )
    .bind(guid)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

/// Check credentials; unknown email and wrong password are both `None`
pub async fn authenticate(pool: &SqlitePool, email: &str, password: &str) -> Result<Option<User>> {
    let row: Option<(String, String, String)> =
        sqlx::query_as("SELECT guid, password_hash, password_salt FROM users WHERE email = ?")
            .bind(email.trim())
            .fetch_optional(pool)
            .await?;

    let Some((guid, password_hash, salt)) = row else {
        // Spend the same work as a real check
        let _ = hash_password(password, &generate_salt());
        return Ok(None);
    };

    if !verify_password(password, &salt, &password_hash) {
        return Ok(None);
    }

    get_user(pool, &guid).await
}

pub async fn list_users(pool: &SqlitePool) -> Result<Vec<User>> {
    let users = sqlx::query_as::<_, User>(
        "SELECT guid, email, display_name, role, created_at FROM users ORDER BY created_at, email",
    )
    .fetch_all(pool)
    .await?;
    Ok(users)
}

pub async fn set_role(pool: &SqlitePool, guid: &str, role: Role) -> Result<()> {
    let result = sqlx::query("UPDATE users SET role = ?, updated_at = CURRENT_TIMESTAMP WHERE guid = ?")
        .bind(role)
        .bind(guid)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("User {}", guid)));
    }
    info!(user_id = %guid, role = %role, "Changed user role");
    Ok(())
}

/// Start a session; returns the raw token for the cookie
pub async fn create_session(pool: &SqlitePool, user_id: &str, ttl_hours: i64) -> Result<String> {
    let token = generate_session_token();
    let expires_at = (Utc::now() + Duration::hours(ttl_hours)).naive_utc();

    sqlx::query("INSERT INTO sessions (token_hash, user_id, expires_at) VALUES (?, ?, ?)")
        .bind(hash_token(&token))
        .bind(user_id)
        .bind(expires_at)
        .execute(pool)
        .await?;

    debug!(user_id = %user_id, "Created session");
    Ok(token)
}

/// Resolve a session token to its user
///
/// An expired session is deleted on sight and treated as absent.
pub async fn user_for_session(pool: &SqlitePool, token: &str) -> Result<Option<User>> {
    let token_hash = hash_token(token);
    let row: Option<(String, chrono::NaiveDateTime)> =
        sqlx::query_as("SELECT user_id, expires_at FROM sessions WHERE token_hash = ?")
            .bind(&token_hash)
            .fetch_optional(pool)
            .await?;

    let Some((user_id, expires_at)) = row else {
        return Ok(None);
    };

    if expires_at <= Utc::now().naive_utc() {
        sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(&token_hash)
            .execute(pool)
            .await?;
        debug!(user_id = %user_id, "Purged expired session");
        return Ok(None);
    }

    get_user(pool, &user_id).await
}

pub async fn delete_session(pool: &SqlitePool, token: &str) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
        .bind(hash_token(token))
        .execute(pool)
        .await?;
    Ok(())
}

/// Remove all expired sessions; run at startup
pub async fn purge_expired_sessions(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
        .bind(Utc::now().naive_utc())
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
