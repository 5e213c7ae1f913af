//! Invite repository

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::{format_timestamp, parse_db_role, parse_db_timestamp, parse_db_uuid};
use crate::models::Invite;

#[derive(Debug, sqlx::FromRow)]
struct InviteRow {
    id: String,
    organization_id: String,
    email: String,
    role: String,
    token: String,
    invited_by: Option<String>,
    expires_at: String,
    accepted_at: Option<String>,
    revoked_at: Option<String>,
    created_at: String,
}

const INVITE_COLUMNS: &str = "id, organization_id, email, role, token, invited_by, expires_at, accepted_at, revoked_at, created_at";

pub struct InviteRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> InviteRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, invite: &Invite) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO invites (id, organization_id, email, role, token, invited_by, expires_at, accepted_at, revoked_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(invite.id.to_string())
        .bind(invite.organization_id.to_string())
        .bind(&invite.email)
        .bind(invite.role.as_str())
        .bind(&invite.token)
        .bind(invite.invited_by.map(|id| id.to_string()))
        .bind(format_timestamp(invite.expires_at))
        .bind(invite.accepted_at.map(format_timestamp))
        .bind(invite.revoked_at.map(format_timestamp))
        .bind(format_timestamp(invite.created_at))
        .execute(self.pool)
        .await
        .context("Failed to create invite")?;

        Ok(())
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Invite>> {
        let row = sqlx::query_as::<_, InviteRow>(&format!(
            "SELECT {} FROM invites WHERE id = ?",
            INVITE_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(self.pool)
        .await
        .context("Failed to get invite")?;

        row.map(row_to_invite).transpose()
    }

    pub async fn get_by_token(&self, token: &str) -> Result<Option<Invite>> {
        let row = sqlx::query_as::<_, InviteRow>(&format!(
            "SELECT {} FROM invites WHERE token = ?",
            INVITE_COLUMNS
        ))
        .bind(token)
        .fetch_optional(self.pool)
        .await
        .context("Failed to get invite by token")?;

        row.map(row_to_invite).transpose()
    }

    /// Stamp `accepted_at` if the invite is still pending at `now`.
    ///
    /// This is the single guard for exactly-once redemption: of any number of
    /// concurrent callers, only one sees `true`.
    pub async fn mark_accepted(
        conn: &mut SqliteConnection,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let now = format_timestamp(now);
        let result = sqlx::query(
            r#"
            UPDATE invites
            SET accepted_at = ?
            WHERE token = ?
              AND accepted_at IS NULL
              AND revoked_at IS NULL
              AND expires_at > ?
            "#,
        )
        .bind(&now)
        .bind(token)
        .bind(&now)
        .execute(conn)
        .await
        .context("Failed to accept invite")?;

        Ok(result.rows_affected() == 1)
    }

    /// Force expiry and stamp revocation unless already accepted
    pub async fn revoke(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        let now = format_timestamp(now);
        let result = sqlx::query(
            r#"
            UPDATE invites
            SET expires_at = ?, revoked_at = ?
            WHERE id = ? AND accepted_at IS NULL
            "#,
        )
        .bind(&now)
        .bind(&now)
        .bind(id.to_string())
        .execute(self.pool)
        .await
        .context("Failed to revoke invite")?;

        Ok(result.rows_affected() > 0)
    }

    /// Pending invites of an organization, newest first
    pub async fn list_pending(
        &self,
        organization_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<Invite>> {
        let rows = sqlx::query_as::<_, InviteRow>(&format!(
            r#"
            SELECT {} FROM invites
            WHERE organization_id = ?
              AND accepted_at IS NULL
              AND revoked_at IS NULL
              AND expires_at > ?
            ORDER BY created_at DESC
            "#,
            INVITE_COLUMNS
        ))
        .bind(organization_id.to_string())
        .bind(format_timestamp(now))
        .fetch_all(self.pool)
        .await
        .context("Failed to list pending invites")?;

        rows.into_iter().map(row_to_invite).collect()
    }

    /// Most recently accepted invites of an organization
    pub async fn list_accepted(&self, organization_id: Uuid, limit: u32) -> Result<Vec<Invite>> {
        let rows = sqlx::query_as::<_, InviteRow>(&format!(
            r#"
            SELECT {} FROM invites
            WHERE organization_id = ? AND accepted_at IS NOT NULL
            ORDER BY accepted_at DESC
            LIMIT ?
            "#,
            INVITE_COLUMNS
        ))
        .bind(organization_id.to_string())
        .bind(limit as i64)
        .fetch_all(self.pool)
        .await
        .context("Failed to list accepted invites")?;

        rows.into_iter().map(row_to_invite).collect()
    }
}

fn row_to_invite(row: InviteRow) -> Result<Invite> {
    Ok(Invite {
        id: parse_db_uuid(&row.id)?,
        organization_id: parse_db_uuid(&row.organization_id)?,
        email: row.email,
        role: parse_db_role(&row.role)?,
        token: row.token,
        invited_by: row.invited_by.as_deref().map(parse_db_uuid).transpose()?,
        expires_at: parse_db_timestamp(&row.expires_at)?,
        accepted_at: row.accepted_at.as_deref().map(parse_db_timestamp).transpose()?,
        revoked_at: row.revoked_at.as_deref().map(parse_db_timestamp).transpose()?,
        created_at: parse_db_timestamp(&row.created_at)?,
    })
}
