//! Identity repository

use anyhow::{Context, Result};
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::{format_timestamp, parse_db_timestamp, parse_db_uuid};
use crate::models::Identity;

#[derive(Debug, sqlx::FromRow)]
struct IdentityRow {
    id: String,
    email: String,
    password_hash: String,
    first_name: String,
    last_name: String,
    job_title: Option<String>,
    phone: Option<String>,
    timezone: String,
    locale: String,
    created_at: String,
}

const IDENTITY_COLUMNS: &str = "id, email, password_hash, first_name, last_name, job_title, phone, timezone, locale, created_at";

pub struct IdentityRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> IdentityRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert an identity on the given connection (usually a transaction)
    pub async fn insert(conn: &mut SqliteConnection, identity: &Identity) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO identities (id, email, password_hash, first_name, last_name, job_title, phone, timezone, locale, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(identity.id.to_string())
        .bind(&identity.email)
        .bind(&identity.password_hash)
        .bind(&identity.first_name)
        .bind(&identity.last_name)
        .bind(identity.job_title.as_deref())
        .bind(identity.phone.as_deref())
        .bind(&identity.timezone)
        .bind(&identity.locale)
        .bind(format_timestamp(identity.created_at))
        .execute(conn)
        .await
        .context("Failed to create identity")?;

        Ok(())
    }

    pub async fn create(&self, identity: &Identity) -> Result<()> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .context("Failed to acquire connection")?;
        Self::insert(&mut conn, identity).await
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Identity>> {
        let row = sqlx::query_as::<_, IdentityRow>(&format!(
            "SELECT {} FROM identities WHERE id = ?",
            IDENTITY_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(self.pool)
        .await
        .context("Failed to get identity")?;

        row.map(row_to_identity).transpose()
    }

    /// Lookup by an already normalized email
    pub async fn get_by_email(&self, email: &str) -> Result<Option<Identity>> {
        let row = sqlx::query_as::<_, IdentityRow>(&format!(
            "SELECT {} FROM identities WHERE email = ?",
            IDENTITY_COLUMNS
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await
        .context("Failed to get identity by email")?;

        row.map(row_to_identity).transpose()
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM identities WHERE email = ?")
            .bind(email)
            .fetch_one(self.pool)
            .await
            .context("Failed to check identity email")?;

        Ok(count > 0)
    }
}

fn row_to_identity(row: IdentityRow) -> Result<Identity> {
    Ok(Identity {
        id: parse_db_uuid(&row.id)?,
        email: row.email,
        password_hash: row.password_hash,
        first_name: row.first_name,
        last_name: row.last_name,
        job_title: row.job_title,
        phone: row.phone,
        timezone: row.timezone,
        locale: row.locale,
        created_at: parse_db_timestamp(&row.created_at)?,
    })
}
