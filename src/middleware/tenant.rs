//! Tenant resolution
//!
//! The active organization comes from the tenant header when present,
//! otherwise from the caller's earliest active membership. A caller that is
//! not an active member of the requested organization gets the same 403
//! whether or not the organization exists.

use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::debug;
use uuid::Uuid;

use crate::models::Membership;
use crate::utils::error::AppError;
use crate::AppState;

use super::auth::AuthUser;

/// Organization a request acts on, with the caller's membership in it
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub identity_id: Uuid,
    pub organization_id: Uuid,
    pub membership: Membership,
}

impl FromRequestParts<AppState> for TenantContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| AppError::unauthorized("Authentication required"))?;

        let requested = match parts.headers.get(state.config.tenancy.header.as_str()) {
            Some(value) => {
                let raw = value
                    .to_str()
                    .map_err(|_| AppError::bad_request("Invalid tenant header"))?;
                Some(
                    Uuid::parse_str(raw.trim())
                        .map_err(|_| AppError::bad_request("Invalid tenant header"))?,
                )
            }
            None => None,
        };

        let ledger = state.memberships();
        let membership = match requested {
            Some(organization_id) => ledger
                .find(user.id, organization_id)
                .await?
                .filter(|m| m.is_active),
            None => ledger.find_active_for_identity(user.id).await?,
        };

        let Some(membership) = membership else {
            debug!(identity_id = %user.id, requested = ?requested, "No active membership for tenant");
            return Err(AppError::forbidden("Not a member of this organization"));
        };

        Ok(Self {
            identity_id: user.id,
            organization_id: membership.organization_id,
            membership,
        })
    }
}
