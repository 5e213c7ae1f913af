//! Membership repository

use anyhow::{Context, Result};
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::{format_timestamp, parse_db_role, parse_db_timestamp, parse_db_uuid};
use crate::models::{Membership, TeamMember};

#[derive(Debug, sqlx::FromRow)]
struct MembershipRow {
    id: String,
    identity_id: String,
    organization_id: String,
    role: String,
    is_active: bool,
    joined_at: String,
}

#[derive(Debug, sqlx::FromRow)]
struct TeamMemberRow {
    id: String,
    identity_id: String,
    email: String,
    first_name: String,
    last_name: String,
    role: String,
    joined_at: String,
}

const MEMBERSHIP_COLUMNS: &str = "id, identity_id, organization_id, role, is_active, joined_at";

pub struct MembershipRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> MembershipRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a membership; fails on an existing (identity, organization) pair
    pub async fn insert(conn: &mut SqliteConnection, membership: &Membership) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO memberships (id, identity_id, organization_id, role, is_active, joined_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(membership.id.to_string())
        .bind(membership.identity_id.to_string())
        .bind(membership.organization_id.to_string())
        .bind(membership.role.as_str())
        .bind(membership.is_active)
        .bind(format_timestamp(membership.joined_at))
        .execute(conn)
        .await
        .context("Failed to create membership")?;

        Ok(())
    }

    /// Insert a membership unless one already exists for the pair; returns whether a row was added
    pub async fn insert_if_absent(
        conn: &mut SqliteConnection,
        membership: &Membership,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO memberships (id, identity_id, organization_id, role, is_active, joined_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (identity_id, organization_id) DO NOTHING
            "#,
        )
        .bind(membership.id.to_string())
        .bind(membership.identity_id.to_string())
        .bind(membership.organization_id.to_string())
        .bind(membership.role.as_str())
        .bind(membership.is_active)
        .bind(format_timestamp(membership.joined_at))
        .execute(conn)
        .await
        .context("Failed to create membership")?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn create(&self, membership: &Membership) -> Result<()> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .context("Failed to acquire connection")?;
        Self::insert(&mut conn, membership).await
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Membership>> {
        let row = sqlx::query_as::<_, MembershipRow>(&format!(
            "SELECT {} FROM memberships WHERE id = ?",
            MEMBERSHIP_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(self.pool)
        .await
        .context("Failed to get membership")?;

        row.map(row_to_membership).transpose()
    }

    pub async fn get_for_pair(
        &self,
        identity_id: Uuid,
        organization_id: Uuid,
    ) -> Result<Option<Membership>> {
        let row = sqlx::query_as::<_, MembershipRow>(&format!(
            "SELECT {} FROM memberships WHERE identity_id = ? AND organization_id = ?",
            MEMBERSHIP_COLUMNS
        ))
        .bind(identity_id.to_string())
        .bind(organization_id.to_string())
        .fetch_optional(self.pool)
        .await
        .context("Failed to get membership")?;

        row.map(row_to_membership).transpose()
    }

    pub async fn set_active(&self, id: Uuid, active: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE memberships SET is_active = ? WHERE id = ?")
            .bind(active)
            .bind(id.to_string())
            .execute(self.pool)
            .await
            .context("Failed to update membership")?;

        Ok(result.rows_affected() > 0)
    }

    /// Active memberships of an identity, earliest joined first
    pub async fn list_active_for_identity(&self, identity_id: Uuid) -> Result<Vec<Membership>> {
        let rows = sqlx::query_as::<_, MembershipRow>(&format!(
            "SELECT {} FROM memberships WHERE identity_id = ? AND is_active = 1 ORDER BY joined_at, rowid",
            MEMBERSHIP_COLUMNS
        ))
        .bind(identity_id.to_string())
        .fetch_all(self.pool)
        .await
        .context("Failed to list memberships for identity")?;

        rows.into_iter().map(row_to_membership).collect()
    }

    /// Active memberships of an organization in insertion order
    pub async fn list_active_for_org(&self, organization_id: Uuid) -> Result<Vec<Membership>> {
        let rows = sqlx::query_as::<_, MembershipRow>(&format!(
            "SELECT {} FROM memberships WHERE organization_id = ? AND is_active = 1 ORDER BY rowid",
            MEMBERSHIP_COLUMNS
        ))
        .bind(organization_id.to_string())
        .fetch_all(self.pool)
        .await
        .context("Failed to list memberships for organization")?;

        rows.into_iter().map(row_to_membership).collect()
    }

    /// Active members joined with their identity details, in insertion order
    pub async fn list_team(&self, organization_id: Uuid) -> Result<Vec<TeamMember>> {
        let rows = sqlx::query_as::<_, TeamMemberRow>(
            r#"
            SELECT m.id, m.identity_id, i.email, i.first_name, i.last_name, m.role, m.joined_at
            FROM memberships m
            INNER JOIN identities i ON i.id = m.identity_id
            WHERE m.organization_id = ? AND m.is_active = 1
            ORDER BY m.rowid
            "#,
        )
        .bind(organization_id.to_string())
        .fetch_all(self.pool)
        .await
        .context("Failed to list team")?;

        rows
            .into_iter()
            .map(|row| {
                Ok(TeamMember {
                    membership_id: parse_db_uuid(&row.id)?,
                    identity_id: parse_db_uuid(&row.identity_id)?,
                    email: row.email,
                    first_name: row.first_name,
                    last_name: row.last_name,
                    role: parse_db_role(&row.role)?,
                    joined_at: parse_db_timestamp(&row.joined_at)?,
                })
            })
            .collect()
    }
}

fn row_to_membership(row: MembershipRow) -> Result<Membership> {
    Ok(Membership {
        id: parse_db_uuid(&row.id)?,
        identity_id: parse_db_uuid(&row.identity_id)?,
        organization_id: parse_db_uuid(&row.organization_id)?,
        role: parse_db_role(&row.role)?,
        is_active: row.is_active,
        joined_at: parse_db_timestamp(&row.joined_at)?,
    })
}
