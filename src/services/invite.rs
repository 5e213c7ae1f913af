//! Invite engine
//!
//! Issues, validates, revokes and redeems invitation tokens. Redemption is
//! exactly-once: the accepted-at stamp is a guarded UPDATE executed as the
//! first statement of the redeeming transaction, so only one caller can win.

use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::config::{InviteConfig, RegistrationConfig};
use crate::db::{
    DbPool, IdentityRepository, InviteRepository, MembershipRepository, OrganizationRepository,
};
use crate::models::{
    AcceptedInvite, Identity, IdentityProfile, Invite, InviteProfile, InviteSummary, IssueInvite,
    Membership, Redemption, Role,
};
use crate::services::credentials::CredentialStore;
use crate::services::error::{DomainError, DomainResult};
use crate::services::identity::IdentityRegistry;
use crate::services::membership::MembershipLedger;
use crate::utils::validation::{normalize_email, parse_days_valid, validate_email};

/// Random bytes per token (192 bits)
const TOKEN_BYTES: usize = 24;

pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Reject invites that are no longer pending, in redemption order:
/// accepted, then expired (revocation forces expiry).
pub fn ensure_pending(invite: &Invite) -> DomainResult<()> {
    if invite.accepted_at.is_some() {
        return Err(DomainError::InviteAlreadyAccepted);
    }
    if invite.revoked_at.is_some() || invite.expires_at <= Utc::now() {
        return Err(DomainError::InviteExpired);
    }
    Ok(())
}

#[derive(Clone)]
pub struct InviteEngine {
    pool: DbPool,
    credentials: Arc<dyn CredentialStore>,
    config: InviteConfig,
    defaults: RegistrationConfig,
}

impl InviteEngine {
    pub fn new(
        pool: DbPool,
        credentials: Arc<dyn CredentialStore>,
        config: InviteConfig,
        defaults: RegistrationConfig,
    ) -> Self {
        Self {
            pool,
            credentials,
            config,
            defaults,
        }
    }

    /// Issue an invite. The caller must already have passed the authorization gate.
    ///
    /// Unknown roles become `viewer`; a validity that is not a positive
    /// integer becomes the configured default.
    pub async fn issue(&self, request: IssueInvite) -> DomainResult<Invite> {
        let email = normalize_email(&request.email);
        if !validate_email(&email) {
            return Err(DomainError::Validation("Invalid email address".to_string()));
        }

        OrganizationRepository::new(&self.pool)
            .get_by_id(request.organization_id)
            .await?
            .ok_or(DomainError::OrganizationNotFound)?;

        let role = request
            .role
            .as_deref()
            .map(Role::parse_or_viewer)
            .unwrap_or(Role::Viewer);
        let days_valid = parse_days_valid(
            request.days_valid.as_deref(),
            self.config.default_days_valid,
            self.config.max_days_valid,
        );

        let now = Utc::now();
        let expires_at = Duration::try_days(days_valid)
            .and_then(|validity| now.checked_add_signed(validity))
            .ok_or_else(|| DomainError::Validation("Invite validity is out of range".into()))?;
        let invite = Invite {
            id: Uuid::new_v4(),
            organization_id: request.organization_id,
            email,
            role,
            token: generate_token(),
            invited_by: request.invited_by,
            expires_at,
            accepted_at: None,
            revoked_at: None,
            created_at: now,
        };

        InviteRepository::new(&self.pool).create(&invite).await?;

        info!(
            invite_id = %invite.id,
            organization_id = %invite.organization_id,
            role = %invite.role,
            days_valid,
            "Invite issued"
        );
        Ok(invite)
    }

    /// Revoke an invite by forcing its expiry. Accepted invites cannot be revoked.
    pub async fn revoke(&self, invite_id: Uuid) -> DomainResult<Invite> {
        let repo = InviteRepository::new(&self.pool);
        let invite = repo
            .get_by_id(invite_id)
            .await?
            .ok_or(DomainError::InviteNotFound)?;
        if invite.accepted_at.is_some() {
            return Err(DomainError::AlreadyAccepted);
        }

        // Zero rows means it was accepted after the read above.
        if !repo.revoke(invite_id, Utc::now()).await? {
            return Err(DomainError::AlreadyAccepted);
        }

        info!(invite_id = %invite_id, "Invite revoked");
        repo.get_by_id(invite_id)
            .await?
            .ok_or(DomainError::InviteNotFound)
    }

    pub async fn get(&self, invite_id: Uuid) -> DomainResult<Option<Invite>> {
        Ok(InviteRepository::new(&self.pool).get_by_id(invite_id).await?)
    }

    pub async fn find_by_token(&self, token: &str) -> DomainResult<Option<Invite>> {
        Ok(InviteRepository::new(&self.pool)
            .get_by_token(token.trim())
            .await?)
    }

    /// Look up a token and require it to be pending
    pub async fn validate_pending(&self, token: &str) -> DomainResult<Invite> {
        let invite = self
            .find_by_token(token)
            .await?
            .ok_or(DomainError::InviteNotFound)?;
        ensure_pending(&invite)?;
        Ok(invite)
    }

    pub async fn summary(&self, invite: &Invite) -> DomainResult<InviteSummary> {
        let org = OrganizationRepository::new(&self.pool)
            .get_by_id(invite.organization_id)
            .await?
            .ok_or(DomainError::OrganizationNotFound)?;

        Ok(InviteSummary {
            organization_id: org.id,
            organization_name: org.display_name().to_string(),
            email: invite.email.clone(),
            role: invite.role,
            expires_at: invite.expires_at,
        })
    }

    /// Redeem a token, optionally on behalf of an authenticated identity.
    ///
    /// Without an acting identity nothing is applied: the caller is told to
    /// log in (an account exists for the invitee) or to supply a profile.
    pub async fn redeem(
        &self,
        token: &str,
        acting: Option<&Identity>,
    ) -> DomainResult<Redemption> {
        let invite = self.validate_pending(token).await?;

        let Some(identity) = acting else {
            let exists = IdentityRepository::new(&self.pool)
                .email_exists(&invite.email)
                .await?;
            if exists {
                return Ok(Redemption::RequiresLogin {
                    email: invite.email,
                });
            }
            return Ok(Redemption::ProfileRequired(self.summary(&invite).await?));
        };

        if normalize_email(&identity.email) != invite.email {
            warn!(
                invite_id = %invite.id,
                identity_id = %identity.id,
                "Invite redemption rejected: email mismatch"
            );
            return Err(DomainError::EmailMismatch);
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(|e| DomainError::Internal(e.into()))?;
        if !InviteRepository::mark_accepted(&mut *tx, &invite.token, now).await? {
            tx.rollback()
                .await
                .map_err(|e| DomainError::Internal(e.into()))?;
            return Err(self.lost_race(&invite.token).await);
        }

        let candidate = Membership::new(identity.id, invite.organization_id, invite.role, true);
        let created = MembershipRepository::insert_if_absent(&mut *tx, &candidate).await?;
        tx.commit().await.map_err(|e| DomainError::Internal(e.into()))?;

        let membership = if created {
            candidate
        } else {
            MembershipLedger::new(self.pool.clone())
                .find(identity.id, invite.organization_id)
                .await?
                .ok_or(DomainError::MembershipNotFound)?
        };

        info!(
            invite_id = %invite.id,
            identity_id = %identity.id,
            organization_id = %invite.organization_id,
            membership_created = created,
            "Invite accepted"
        );

        let invite = self.reload(invite.id).await?;
        Ok(Redemption::Accepted { invite, membership })
    }

    /// Finish a redemption for an invitee without an account: create the
    /// identity and membership and stamp the invite, all or nothing.
    pub async fn complete_redemption(
        &self,
        token: &str,
        profile: InviteProfile,
    ) -> DomainResult<AcceptedInvite> {
        profile.validate()?;
        let invite = self.validate_pending(token).await?;

        let first_name = profile.first_name.trim().to_string();
        let last_name = profile.last_name.trim().to_string();
        if first_name.is_empty() || last_name.is_empty() {
            return Err(DomainError::Validation(
                "First and last name are required".to_string(),
            ));
        }

        let digest = self.credentials.hash(&profile.password)?;
        let identity = Identity::new(
            invite.email.clone(),
            digest,
            IdentityProfile {
                first_name,
                last_name,
                job_title: None,
                phone: None,
                timezone: self.defaults.default_timezone.clone(),
                locale: self.defaults.default_locale.clone(),
            },
        );
        let membership = Membership::new(identity.id, invite.organization_id, invite.role, true);

        let mut tx = self.pool.begin().await.map_err(|e| DomainError::Internal(e.into()))?;
        if !InviteRepository::mark_accepted(&mut *tx, &invite.token, Utc::now()).await? {
            tx.rollback()
                .await
                .map_err(|e| DomainError::Internal(e.into()))?;
            return Err(self.lost_race(&invite.token).await);
        }

        // Dropping the transaction on any error below rolls back the stamp.
        IdentityRegistry::insert_in(&mut *tx, &identity)
            .await
            .map_err(|e| match e {
                DomainError::DuplicateIdentity => DomainError::EmailAlreadyRegistered,
                other => other,
            })?;
        MembershipLedger::add_in(&mut *tx, &membership).await?;
        tx.commit().await.map_err(|e| DomainError::Internal(e.into()))?;

        info!(
            invite_id = %invite.id,
            identity_id = %identity.id,
            organization_id = %invite.organization_id,
            "Invite accepted with new identity"
        );

        let invite = self.reload(invite.id).await?;
        Ok(AcceptedInvite {
            identity,
            membership,
            invite,
        })
    }

    /// Pending invites, newest first
    pub async fn list_pending(&self, organization_id: Uuid) -> DomainResult<Vec<Invite>> {
        Ok(InviteRepository::new(&self.pool)
            .list_pending(organization_id, Utc::now())
            .await?)
    }

    /// Most recently accepted invites
    pub async fn list_accepted(&self, organization_id: Uuid) -> DomainResult<Vec<Invite>> {
        Ok(InviteRepository::new(&self.pool)
            .list_accepted(organization_id, self.config.history_limit)
            .await?)
    }

    /// Link handed to the notifier; the token travels as a query parameter
    pub fn invitation_url(&self, token: &str) -> String {
        format!(
            "{}/accept-invite?token={}",
            self.config.public_base_url.trim_end_matches('/'),
            urlencoding::encode(token)
        )
    }

    async fn reload(&self, invite_id: Uuid) -> DomainResult<Invite> {
        self.get(invite_id)
            .await?
            .ok_or(DomainError::InviteNotFound)
    }

    /// Explain why the guarded stamp matched no row
    async fn lost_race(&self, token: &str) -> DomainError {
        match self.find_by_token(token).await {
            Ok(Some(current)) => ensure_pending(&current)
                .err()
                .unwrap_or(DomainError::InviteAlreadyAccepted),
            Ok(None) => DomainError::InviteNotFound,
            Err(e) => e,
        }
    }
}
