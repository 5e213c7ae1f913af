//! Team administration
//!
//! Entry point for changing an organization's memberships and invites on
//! behalf of an authenticated caller. Every mutating call passes the
//! authorization gate before touching the ledger or the invite engine.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, warn};
use uuid::Uuid;

use crate::db::audit_repository::AuditEvent;
use crate::db::{AuditRepository, DbPool};
use crate::models::{
    AuditLogEntry, AuditLogQuery, Invite, InviteView, IssueInvite, Membership, TeamMember,
    TEAM_MANAGERS,
};
use crate::services::authorization::AuthorizationGate;
use crate::services::error::{DomainError, DomainResult};
use crate::services::invite::InviteEngine;
use crate::services::membership::MembershipLedger;
use crate::services::notification::InviteNotifier;
use crate::services::organization::OrganizationRegistry;

/// An issued invite together with the link sent to the invitee
#[derive(Debug, Clone)]
pub struct IssuedInvite {
    pub invite: Invite,
    pub invitation_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamOverview {
    pub members: Vec<TeamMember>,
    pub pending_invites: Vec<InviteView>,
}

#[derive(Clone)]
pub struct TeamService {
    pool: DbPool,
    gate: AuthorizationGate,
    ledger: MembershipLedger,
    invites: InviteEngine,
    organizations: OrganizationRegistry,
    notifier: Arc<dyn InviteNotifier>,
}

impl TeamService {
    pub fn new(pool: DbPool, invites: InviteEngine, notifier: Arc<dyn InviteNotifier>) -> Self {
        Self {
            gate: AuthorizationGate::new(pool.clone()),
            ledger: MembershipLedger::new(pool.clone()),
            organizations: OrganizationRegistry::new(pool.clone()),
            pool,
            invites,
            notifier,
        }
    }

    pub async fn invite_member(
        &self,
        actor_id: Uuid,
        organization_id: Uuid,
        email: String,
        role: Option<String>,
        days_valid: Option<String>,
    ) -> DomainResult<IssuedInvite> {
        self.gate
            .require(actor_id, organization_id, TEAM_MANAGERS, "invite.issue")
            .await?;

        let invite = self
            .invites
            .issue(IssueInvite {
                organization_id,
                email,
                role,
                days_valid,
                invited_by: Some(actor_id),
            })
            .await?;
        let invitation_url = self.invites.invitation_url(&invite.token);

        if let Err(e) = self
            .notifier
            .send_invitation(&invite.email, &invitation_url)
            .await
        {
            // The invite stands; the link is still returned to the caller.
            warn!(invite_id = %invite.id, "Failed to deliver invitation: {:#}", e);
        }

        self.audit(
            organization_id,
            actor_id,
            "invite_issued",
            "invite",
            invite.id,
            serde_json::json!({ "email": invite.email, "role": invite.role }),
        )
        .await;

        Ok(IssuedInvite {
            invite,
            invitation_url,
        })
    }

    pub async fn revoke_invite(
        &self,
        actor_id: Uuid,
        organization_id: Uuid,
        invite_id: Uuid,
    ) -> DomainResult<Invite> {
        self.gate
            .require(actor_id, organization_id, TEAM_MANAGERS, "invite.revoke")
            .await?;

        match self.invites.get(invite_id).await? {
            Some(invite) if invite.organization_id == organization_id => {}
            _ => return Err(DomainError::InviteNotFound),
        }

        let invite = self.invites.revoke(invite_id).await?;
        self.audit(
            organization_id,
            actor_id,
            "invite_revoked",
            "invite",
            invite.id,
            serde_json::json!({ "email": invite.email }),
        )
        .await;
        Ok(invite)
    }

    /// Deactivate a member. The organization owner's membership stays active.
    pub async fn deactivate_member(
        &self,
        actor_id: Uuid,
        organization_id: Uuid,
        membership_id: Uuid,
    ) -> DomainResult<Membership> {
        self.gate
            .require(actor_id, organization_id, TEAM_MANAGERS, "membership.deactivate")
            .await?;

        let membership = match self.ledger.get(membership_id).await? {
            Some(m) if m.organization_id == organization_id => m,
            _ => return Err(DomainError::MembershipNotFound),
        };

        let org = self
            .organizations
            .get(organization_id)
            .await?
            .ok_or(DomainError::OrganizationNotFound)?;
        if org.owner_identity_id == Some(membership.identity_id) {
            return Err(DomainError::Validation(
                "The organization owner cannot be deactivated".to_string(),
            ));
        }

        let membership = self.ledger.deactivate(membership.id).await?;
        self.audit(
            organization_id,
            actor_id,
            "membership_deactivated",
            "membership",
            membership.id,
            serde_json::json!({ "identity_id": membership.identity_id }),
        )
        .await;
        Ok(membership)
    }

    /// Active members and pending invites; any member may read this
    pub async fn overview(&self, actor_id: Uuid, organization_id: Uuid) -> DomainResult<TeamOverview> {
        self.gate
            .require_member(actor_id, organization_id, "team.view")
            .await?;

        let members = self.ledger.list_team(organization_id).await?;
        let pending_invites = self
            .invites
            .list_pending(organization_id)
            .await?
            .into_iter()
            .map(InviteView::from)
            .collect();

        Ok(TeamOverview {
            members,
            pending_invites,
        })
    }

    pub async fn invite_history(
        &self,
        actor_id: Uuid,
        organization_id: Uuid,
    ) -> DomainResult<Vec<InviteView>> {
        self.gate
            .require(actor_id, organization_id, TEAM_MANAGERS, "invite.history")
            .await?;

        Ok(self
            .invites
            .list_accepted(organization_id)
            .await?
            .into_iter()
            .map(InviteView::from)
            .collect())
    }

    pub async fn audit_log(
        &self,
        actor_id: Uuid,
        organization_id: Uuid,
        query: &AuditLogQuery,
    ) -> DomainResult<Vec<AuditLogEntry>> {
        self.gate
            .require(actor_id, organization_id, TEAM_MANAGERS, "audit.view")
            .await?;

        Ok(AuditRepository::new(&self.pool)
            .list(organization_id, query)
            .await?)
    }

    async fn audit(
        &self,
        organization_id: Uuid,
        actor_id: Uuid,
        action: &str,
        resource_type: &str,
        resource_id: Uuid,
        details: serde_json::Value,
    ) {
        let event = AuditEvent {
            organization_id: Some(organization_id),
            identity_id: Some(actor_id),
            action,
            resource_type,
            resource_id: Some(resource_id.to_string()),
            details: Some(details),
            ip_address: None,
        };
        if let Err(e) = AuditRepository::new(&self.pool).insert(event).await {
            error!("Failed to record audit entry: {:#}", e);
        }
    }
}
