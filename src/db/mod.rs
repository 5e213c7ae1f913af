//! Database layer
//!
//! This module handles durable storage of:
//! - Identities and their password digests
//! - Organizations and memberships
//! - Invites
//! - The audit trail

pub mod audit_repository;
pub mod identity_repository;
pub mod invite_repository;
pub mod membership_repository;
pub mod organization_repository;

pub use audit_repository::AuditRepository;
pub use identity_repository::IdentityRepository;
pub use invite_repository::InviteRepository;
pub use membership_repository::MembershipRepository;
pub use organization_repository::OrganizationRepository;

use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::models::Role;

/// Database connection pool type
pub type DbPool = Pool<Sqlite>;

/// Initialize the database connection pool and run migrations
pub async fn init_pool(config: &DatabaseConfig) -> Result<DbPool> {
    let options = SqliteConnectOptions::from_str(&config.url)
        .with_context(|| format!("Invalid database URL: {}", config.url))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Some(Duration::from_secs(config.idle_timeout_secs)))
        .connect_with(options)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    Ok(pool)
}

/// Format a timestamp for storage.
///
/// UTC with microseconds. For years 0000 through 9999 the width is fixed, so
/// string comparison in SQL orders the same way as the instants do; callers
/// keep stored instants inside that range.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp; anything unreadable is a corrupt row
pub fn parse_db_timestamp(ts: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S") {
        return Ok(DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc));
    }
    Err(anyhow!("Invalid stored timestamp: {:?}", ts))
}

pub fn parse_db_uuid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).with_context(|| format!("Invalid stored id: {:?}", value))
}

pub fn parse_db_role(value: &str) -> Result<Role> {
    value
        .parse()
        .map_err(|_| anyhow!("Invalid stored role: {:?}", value))
}

/// Whether an error (possibly wrapped in context) is a UNIQUE constraint violation
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| match cause.downcast_ref::<sqlx::Error>() {
        Some(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
        _ => false,
    })
}
