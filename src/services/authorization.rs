//! Authorization gate
//!
//! The single place deciding whether a caller's membership permits an
//! action in an organization. Denials are logged and audited, and never say
//! whether the target resource exists.

use tracing::{error, warn};
use uuid::Uuid;

use crate::db::audit_repository::AuditEvent;
use crate::db::{AuditRepository, DbPool};
use crate::models::{Membership, Role};
use crate::services::error::{DomainError, DomainResult};
use crate::services::membership::MembershipLedger;

#[derive(Clone)]
pub struct AuthorizationGate {
    pool: DbPool,
    ledger: MembershipLedger,
}

impl AuthorizationGate {
    pub fn new(pool: DbPool) -> Self {
        Self {
            ledger: MembershipLedger::new(pool.clone()),
            pool,
        }
    }

    pub async fn authorize(
        &self,
        identity_id: Uuid,
        organization_id: Uuid,
        required: &[Role],
    ) -> DomainResult<bool> {
        self.ledger
            .has_role(identity_id, organization_id, required)
            .await
    }

    /// Require a role in `required` for `action`, returning the caller's membership
    pub async fn require(
        &self,
        identity_id: Uuid,
        organization_id: Uuid,
        required: &[Role],
        action: &str,
    ) -> DomainResult<Membership> {
        match self.ledger.find(identity_id, organization_id).await? {
            Some(m) if m.is_active && required.contains(&m.role) => Ok(m),
            _ => {
                self.deny(identity_id, organization_id, action).await;
                Err(DomainError::Forbidden)
            }
        }
    }

    /// Require any active membership; the baseline for reading one's own organization
    pub async fn require_member(
        &self,
        identity_id: Uuid,
        organization_id: Uuid,
        action: &str,
    ) -> DomainResult<Membership> {
        self.require(identity_id, organization_id, &Role::ALL, action)
            .await
    }

    async fn deny(&self, identity_id: Uuid, organization_id: Uuid, action: &str) {
        warn!(
            identity_id = %identity_id,
            organization_id = %organization_id,
            action = action,
            "Authorization denied"
        );

        let event = AuditEvent {
            organization_id: Some(organization_id),
            identity_id: Some(identity_id),
            action: "authorization_denied",
            resource_type: "authorization",
            details: Some(serde_json::json!({ "action": action })),
            ..Default::default()
        };
        if let Err(e) = AuditRepository::new(&self.pool).insert(event).await {
            error!("Failed to record authorization denial: {:#}", e);
        }
    }
}
