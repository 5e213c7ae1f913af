//! Organization (tenant) repository

use anyhow::{Context, Result};
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::{format_timestamp, parse_db_timestamp, parse_db_uuid};
use crate::models::Organization;

#[derive(Debug, sqlx::FromRow)]
struct OrganizationRow {
    id: String,
    legal_name: String,
    trade_name: Option<String>,
    tax_id: Option<String>,
    country: String,
    timezone: String,
    plan: String,
    industry: Option<String>,
    owner_identity_id: Option<String>,
    created_at: String,
}

pub struct OrganizationRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> OrganizationRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(conn: &mut SqliteConnection, org: &Organization) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO organizations (id, legal_name, trade_name, tax_id, country, timezone, plan, industry, owner_identity_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(org.id.to_string())
        .bind(&org.legal_name)
        .bind(org.trade_name.as_deref())
        .bind(org.tax_id.as_deref())
        .bind(&org.country)
        .bind(&org.timezone)
        .bind(&org.plan)
        .bind(org.industry.as_deref())
        .bind(org.owner_identity_id.map(|id| id.to_string()))
        .bind(format_timestamp(org.created_at))
        .execute(conn)
        .await
        .context("Failed to create organization")?;

        Ok(())
    }

    pub async fn create(&self, org: &Organization) -> Result<()> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .context("Failed to acquire connection")?;
        Self::insert(&mut conn, org).await
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Organization>> {
        let row = sqlx::query_as::<_, OrganizationRow>(
            r#"
            SELECT id, legal_name, trade_name, tax_id, country, timezone, plan, industry, owner_identity_id, created_at
            FROM organizations
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(self.pool)
        .await
        .context("Failed to get organization")?;

        row.map(row_to_org).transpose()
    }

    /// Set the owner only if none is set yet; returns whether the row changed
    pub async fn set_owner(
        conn: &mut SqliteConnection,
        org_id: Uuid,
        identity_id: Uuid,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE organizations
            SET owner_identity_id = ?
            WHERE id = ? AND owner_identity_id IS NULL
            "#,
        )
        .bind(identity_id.to_string())
        .bind(org_id.to_string())
        .execute(conn)
        .await
        .context("Failed to set organization owner")?;

        Ok(result.rows_affected() > 0)
    }

    /// Organizations where the identity holds an active membership, oldest first
    pub async fn list_for_identity(&self, identity_id: Uuid) -> Result<Vec<Organization>> {
        let rows = sqlx::query_as::<_, OrganizationRow>(
            r#"
            SELECT o.id, o.legal_name, o.trade_name, o.tax_id, o.country, o.timezone, o.plan,
                   o.industry, o.owner_identity_id, o.created_at
            FROM organizations o
            INNER JOIN memberships m ON m.organization_id = o.id
            WHERE m.identity_id = ? AND m.is_active = 1
            ORDER BY m.joined_at, m.rowid
            "#,
        )
        .bind(identity_id.to_string())
        .fetch_all(self.pool)
        .await
        .context("Failed to list organizations for identity")?;

        rows.into_iter().map(row_to_org).collect()
    }
}

fn row_to_org(row: OrganizationRow) -> Result<Organization> {
    Ok(Organization {
        id: parse_db_uuid(&row.id)?,
        legal_name: row.legal_name,
        trade_name: row.trade_name,
        tax_id: row.tax_id,
        country: row.country,
        timezone: row.timezone,
        plan: row.plan,
        industry: row.industry,
        owner_identity_id: row.owner_identity_id.as_deref().map(parse_db_uuid).transpose()?,
        created_at: parse_db_timestamp(&row.created_at)?,
    })
}
