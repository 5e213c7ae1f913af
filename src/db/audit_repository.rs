//! Audit log repository

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{format_timestamp, parse_db_timestamp, parse_db_uuid};
use crate::models::{AuditLogEntry, AuditLogQuery};

#[derive(Debug, sqlx::FromRow)]
struct AuditRow {
    id: String,
    organization_id: Option<String>,
    identity_id: Option<String>,
    action: String,
    resource_type: String,
    resource_id: Option<String>,
    details: Option<String>,
    ip_address: Option<String>,
    created_at: String,
}

/// A single audit event to record
#[derive(Debug, Clone, Default)]
pub struct AuditEvent<'e> {
    pub organization_id: Option<Uuid>,
    pub identity_id: Option<Uuid>,
    pub action: &'e str,
    pub resource_type: &'e str,
    pub resource_id: Option<String>,
    pub details: Option<serde_json::Value>,
    pub ip_address: Option<String>,
}

pub struct AuditRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> AuditRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, event: AuditEvent<'_>) -> Result<AuditLogEntry> {
        let id = Uuid::new_v4();
        let created_at = format_timestamp(Utc::now());
        let details_str = event.details.as_ref().map(|d| d.to_string());

        sqlx::query(
            r#"
            INSERT INTO audit_log (id, organization_id, identity_id, action, resource_type, resource_id, details, ip_address, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(event.organization_id.map(|o| o.to_string()))
        .bind(event.identity_id.map(|u| u.to_string()))
        .bind(event.action)
        .bind(event.resource_type)
        .bind(event.resource_id.as_deref())
        .bind(details_str.as_deref())
        .bind(event.ip_address.as_deref())
        .bind(&created_at)
        .execute(self.pool)
        .await
        .context("Failed to insert audit log entry")?;

        Ok(AuditLogEntry {
            id,
            organization_id: event.organization_id,
            identity_id: event.identity_id,
            action: event.action.to_string(),
            resource_type: event.resource_type.to_string(),
            resource_id: event.resource_id,
            details: event.details,
            ip_address: event.ip_address,
            created_at: parse_db_timestamp(&created_at)?,
        })
    }

    pub async fn list(
        &self,
        organization_id: Uuid,
        query: &AuditLogQuery,
    ) -> Result<Vec<AuditLogEntry>> {
        let mut sql = String::from(
            "SELECT id, organization_id, identity_id, action, resource_type, resource_id, details, ip_address, created_at FROM audit_log WHERE organization_id = ?",
        );

        if query.identity_id.is_some() {
            sql.push_str(" AND identity_id = ?");
        }
        if query.resource_type.is_some() {
            sql.push_str(" AND resource_type = ?");
        }
        if query.action.is_some() {
            sql.push_str(" AND action = ?");
        }

        sql.push_str(" ORDER BY created_at DESC");

        if query.limit.is_some() {
            sql.push_str(" LIMIT ?");
        } else {
            sql.push_str(" LIMIT 100");
        }
        if query.offset.is_some() {
            sql.push_str(" OFFSET ?");
        }

        let mut q = sqlx::query_as::<_, AuditRow>(&sql).bind(organization_id.to_string());
        if let Some(identity_id) = query.identity_id {
            q = q.bind(identity_id.to_string());
        }
        if let Some(ref resource_type) = query.resource_type {
            q = q.bind(resource_type);
        }
        if let Some(ref action) = query.action {
            q = q.bind(action);
        }
        if let Some(limit) = query.limit {
            q = q.bind(limit as i64);
        }
        if let Some(offset) = query.offset {
            q = q.bind(offset as i64);
        }

        let rows = q
            .fetch_all(self.pool)
            .await
            .context("Failed to list audit logs")?;

        rows.into_iter().map(row_to_audit).collect()
    }
}

fn row_to_audit(row: AuditRow) -> Result<AuditLogEntry> {
    let details = row
        .details
        .as_deref()
        .map(serde_json::from_str::<serde_json::Value>)
        .transpose()
        .context("Invalid stored audit details")?;

    Ok(AuditLogEntry {
        id: parse_db_uuid(&row.id)?,
        organization_id: row.organization_id.as_deref().map(parse_db_uuid).transpose()?,
        identity_id: row.identity_id.as_deref().map(parse_db_uuid).transpose()?,
        action: row.action,
        resource_type: row.resource_type,
        resource_id: row.resource_id,
        details,
        ip_address: row.ip_address,
        created_at: parse_db_timestamp(&row.created_at)?,
    })
}
