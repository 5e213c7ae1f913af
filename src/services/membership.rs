//! Membership ledger
//!
//! At most one membership row exists per (identity, organization) pair,
//! active or not. Memberships are deactivated, never deleted.

use sqlx::SqliteConnection;
use tracing::info;
use uuid::Uuid;

use crate::db::{is_unique_violation, DbPool, MembershipRepository};
use crate::models::{Membership, Role, TeamMember};
use crate::services::error::{DomainError, DomainResult};

#[derive(Clone)]
pub struct MembershipLedger {
    pool: DbPool,
}

impl MembershipLedger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn add(
        &self,
        identity_id: Uuid,
        organization_id: Uuid,
        role: Role,
        active: bool,
    ) -> DomainResult<Membership> {
        let membership = Membership::new(identity_id, organization_id, role, active);
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| DomainError::Internal(e.into()))?;
        Self::add_in(&mut conn, &membership).await?;
        Ok(membership)
    }

    /// Insert on an open connection or transaction; `DuplicateMembership` on an existing pair
    pub async fn add_in(conn: &mut SqliteConnection, membership: &Membership) -> DomainResult<()> {
        MembershipRepository::insert(conn, membership)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    DomainError::DuplicateMembership
                } else {
                    DomainError::Internal(e)
                }
            })?;

        info!(
            membership_id = %membership.id,
            identity_id = %membership.identity_id,
            organization_id = %membership.organization_id,
            role = %membership.role,
            "Membership added"
        );
        Ok(())
    }

    /// Deactivate a membership; deactivating an inactive one is a no-op
    pub async fn deactivate(&self, membership_id: Uuid) -> DomainResult<Membership> {
        let repo = MembershipRepository::new(&self.pool);
        let mut membership = repo
            .get_by_id(membership_id)
            .await?
            .ok_or(DomainError::MembershipNotFound)?;

        if membership.is_active {
            repo.set_active(membership_id, false).await?;
            membership.is_active = false;
            info!(membership_id = %membership_id, "Membership deactivated");
        }

        Ok(membership)
    }

    pub async fn get(&self, membership_id: Uuid) -> DomainResult<Option<Membership>> {
        Ok(MembershipRepository::new(&self.pool)
            .get_by_id(membership_id)
            .await?)
    }

    pub async fn find(
        &self,
        identity_id: Uuid,
        organization_id: Uuid,
    ) -> DomainResult<Option<Membership>> {
        Ok(MembershipRepository::new(&self.pool)
            .get_for_pair(identity_id, organization_id)
            .await?)
    }

    /// The first active membership of an identity (earliest joined)
    pub async fn find_active_for_identity(
        &self,
        identity_id: Uuid,
    ) -> DomainResult<Option<Membership>> {
        Ok(self
            .list_active_for_identity(identity_id)
            .await?
            .into_iter()
            .next())
    }

    pub async fn list_active_for_identity(&self, identity_id: Uuid) -> DomainResult<Vec<Membership>> {
        Ok(MembershipRepository::new(&self.pool)
            .list_active_for_identity(identity_id)
            .await?)
    }

    pub async fn list_active_for_org(&self, organization_id: Uuid) -> DomainResult<Vec<Membership>> {
        Ok(MembershipRepository::new(&self.pool)
            .list_active_for_org(organization_id)
            .await?)
    }

    pub async fn list_team(&self, organization_id: Uuid) -> DomainResult<Vec<TeamMember>> {
        Ok(MembershipRepository::new(&self.pool)
            .list_team(organization_id)
            .await?)
    }

    /// True iff an active membership exists for the pair with a role in `allowed`
    pub async fn has_role(
        &self,
        identity_id: Uuid,
        organization_id: Uuid,
        allowed: &[Role],
    ) -> DomainResult<bool> {
        Ok(self
            .find(identity_id, organization_id)
            .await?
            .is_some_and(|m| m.is_active && allowed.contains(&m.role)))
    }
}
