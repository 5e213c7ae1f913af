//! Organization (tenant) API endpoints

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    middleware::{AuthUser, TenantContext},
    models::{AuditLogEntry, AuditLogQuery, Membership, Organization, Role},
    services::TeamOverview,
    utils::error::{AppError, AppResult},
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_organizations))
        .route("/current", get(get_current_organization))
        .route("/current/team", get(get_team))
        .route(
            "/current/members/{id}/deactivate",
            post(deactivate_member),
        )
        .route("/current/audit-log", get(get_audit_log))
}

#[derive(Debug, Serialize)]
pub struct CurrentOrganization {
    pub organization: Organization,
    pub role: Role,
    pub membership_id: Uuid,
}

/// Organizations the caller is an active member of
///
/// GET /api/v1/organizations
async fn list_organizations(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<Vec<Organization>>> {
    Ok(Json(
        state.organizations().list_for_identity(auth_user.id).await?,
    ))
}

/// GET /api/v1/organizations/current
async fn get_current_organization(
    State(state): State<AppState>,
    tenant: TenantContext,
) -> AppResult<Json<CurrentOrganization>> {
    let organization = state
        .organizations()
        .get(tenant.organization_id)
        .await?
        .ok_or_else(|| AppError::not_found("Organization not found"))?;

    Ok(Json(CurrentOrganization {
        organization,
        role: tenant.membership.role,
        membership_id: tenant.membership.id,
    }))
}

/// GET /api/v1/organizations/current/team
async fn get_team(
    State(state): State<AppState>,
    tenant: TenantContext,
) -> AppResult<Json<TeamOverview>> {
    Ok(Json(
        state
            .team()
            .overview(tenant.identity_id, tenant.organization_id)
            .await?,
    ))
}

/// POST /api/v1/organizations/current/members/{id}/deactivate
async fn deactivate_member(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<String>,
) -> AppResult<Json<Membership>> {
    let membership_id =
        Uuid::parse_str(&id).map_err(|_| AppError::bad_request("Invalid membership ID"))?;
    Ok(Json(
        state
            .team()
            .deactivate_member(tenant.identity_id, tenant.organization_id, membership_id)
            .await?,
    ))
}

/// GET /api/v1/organizations/current/audit-log
async fn get_audit_log(
    State(state): State<AppState>,
    tenant: TenantContext,
    Query(query): Query<AuditLogQuery>,
) -> AppResult<Json<Vec<AuditLogEntry>>> {
    Ok(Json(
        state
            .team()
            .audit_log(tenant.identity_id, tenant.organization_id, &query)
            .await?,
    ))
}
