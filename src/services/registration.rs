//! Registration wizard
//!
//! Step functions take the current draft and the step input and return the
//! next draft. Nothing durable is written until a terminal step, which
//! creates everything in one transaction.

use std::sync::Arc;

use tracing::{debug, info};
use validator::Validate;

use crate::config::RegistrationConfig;
use crate::db::DbPool;
use crate::models::{
    AcceptedInvite, CompanyRegistration, CompanyStepInput, ConfirmInput, DraftCompany,
    DraftInvite, DraftUser, Identity, IdentityProfile, InviteProfile, InviteTokenInput,
    Membership, NewOrganization, RegistrationDraft, RegistrationMode, Role, UserStepInput,
};
use crate::services::credentials::CredentialStore;
use crate::services::error::{DomainError, DomainResult};
use crate::services::identity::IdentityRegistry;
use crate::services::invite::InviteEngine;
use crate::services::membership::MembershipLedger;
use crate::services::organization::OrganizationRegistry;
use crate::utils::validation::{non_blank, normalize_country, normalize_email, validate_country};

#[derive(Clone)]
pub struct RegistrationWizard {
    pool: DbPool,
    credentials: Arc<dyn CredentialStore>,
    config: RegistrationConfig,
    identities: IdentityRegistry,
    invites: InviteEngine,
}

impl RegistrationWizard {
    pub fn new(
        pool: DbPool,
        credentials: Arc<dyn CredentialStore>,
        config: RegistrationConfig,
        invites: InviteEngine,
    ) -> Self {
        Self {
            identities: IdentityRegistry::new(pool.clone(), credentials.clone()),
            pool,
            credentials,
            config,
            invites,
        }
    }

    /// Start over in the given mode
    pub fn choose_mode(&self, mode: RegistrationMode) -> RegistrationDraft {
        RegistrationDraft::new(mode)
    }

    pub fn reset(&self) -> RegistrationDraft {
        RegistrationDraft::default()
    }

    /// Company path, step 1: account details
    pub async fn submit_user(
        &self,
        draft: RegistrationDraft,
        mut input: UserStepInput,
    ) -> DomainResult<RegistrationDraft> {
        if draft.mode != Some(RegistrationMode::Company) {
            return Err(DomainError::StepOutOfOrder);
        }

        input.email = normalize_email(&input.email);
        input.validate()?;
        let first_name = input.first_name.trim().to_string();
        let last_name = input.last_name.trim().to_string();
        if first_name.is_empty() || last_name.is_empty() {
            return Err(DomainError::Validation(
                "First and last name are required".to_string(),
            ));
        }

        if self.identities.exists(&input.email).await? {
            return Err(DomainError::EmailAlreadyRegistered);
        }

        let password_hash = self.credentials.hash(&input.password)?;
        let user = DraftUser {
            email: input.email,
            first_name,
            last_name,
            job_title: non_blank(input.job_title),
            phone: non_blank(input.phone),
            timezone: non_blank(input.timezone)
                .unwrap_or_else(|| self.config.default_timezone.clone()),
            password_hash,
        };

        debug!("Registration user step accepted");
        Ok(RegistrationDraft {
            user: Some(user),
            ..draft
        })
    }

    /// Company path, step 2: organization details
    pub fn submit_company(
        &self,
        draft: RegistrationDraft,
        input: CompanyStepInput,
    ) -> DomainResult<RegistrationDraft> {
        if draft.mode != Some(RegistrationMode::Company) {
            return Err(DomainError::StepOutOfOrder);
        }
        let Some(user) = draft.user.as_ref() else {
            return Err(DomainError::StepOutOfOrder);
        };

        input.validate()?;
        let legal_name = input.legal_name.trim().to_string();
        if legal_name.is_empty() {
            return Err(DomainError::Validation("Legal name is required".to_string()));
        }
        let country = non_blank(input.country)
            .map(|c| normalize_country(&c))
            .unwrap_or_else(|| self.config.default_country.clone());
        if !validate_country(&country) {
            return Err(DomainError::Validation(format!(
                "Invalid country code: {}",
                country
            )));
        }

        let company = DraftCompany {
            legal_name,
            trade_name: non_blank(input.trade_name),
            tax_id: non_blank(input.tax_id),
            country,
            timezone: non_blank(input.timezone).unwrap_or_else(|| user.timezone.clone()),
            industry: non_blank(input.industry),
        };

        Ok(RegistrationDraft {
            company: Some(company),
            ..draft
        })
    }

    /// Company path, final step: create organization, identity and owner
    /// membership atomically
    pub async fn confirm_company(
        &self,
        draft: &RegistrationDraft,
        input: ConfirmInput,
    ) -> DomainResult<CompanyRegistration> {
        let (Some(RegistrationMode::Company), Some(user), Some(company)) =
            (draft.mode, draft.user.as_ref(), draft.company.as_ref())
        else {
            return Err(DomainError::StepOutOfOrder);
        };

        if self.config.require_terms && !input.accept_terms {
            return Err(DomainError::TermsNotAccepted);
        }

        // Another session may have registered the email since the first step.
        if self.identities.exists(&user.email).await? {
            return Err(DomainError::EmailAlreadyRegistered);
        }

        let mut organization = OrganizationRegistry::prepare(NewOrganization {
            legal_name: company.legal_name.clone(),
            trade_name: company.trade_name.clone(),
            tax_id: company.tax_id.clone(),
            country: company.country.clone(),
            timezone: company.timezone.clone(),
            plan: self.config.default_plan.clone(),
            industry: company.industry.clone(),
        })?;
        let identity = Identity::new(
            user.email.clone(),
            user.password_hash.clone(),
            IdentityProfile {
                first_name: user.first_name.clone(),
                last_name: user.last_name.clone(),
                job_title: user.job_title.clone(),
                phone: user.phone.clone(),
                timezone: user.timezone.clone(),
                locale: self.config.default_locale.clone(),
            },
        );
        let membership = Membership::new(identity.id, organization.id, Role::Owner, true);

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::Internal(e.into()))?;
        OrganizationRegistry::insert_in(&mut *tx, &organization).await?;
        IdentityRegistry::insert_in(&mut *tx, &identity)
            .await
            .map_err(|e| match e {
                DomainError::DuplicateIdentity => DomainError::EmailAlreadyRegistered,
                other => other,
            })?;
        OrganizationRegistry::set_owner_in(&mut *tx, organization.id, identity.id).await?;
        MembershipLedger::add_in(&mut *tx, &membership).await?;
        tx.commit()
            .await
            .map_err(|e| DomainError::Internal(e.into()))?;

        organization.owner_identity_id = Some(identity.id);
        info!(
            organization_id = %organization.id,
            identity_id = %identity.id,
            "Company registration completed"
        );

        Ok(CompanyRegistration {
            organization,
            identity,
            membership,
        })
    }

    /// Invite path, step 1: the token must be pending
    pub async fn submit_invite_token(
        &self,
        draft: RegistrationDraft,
        input: InviteTokenInput,
    ) -> DomainResult<RegistrationDraft> {
        if draft.mode != Some(RegistrationMode::Invite) {
            return Err(DomainError::StepOutOfOrder);
        }
        input.validate()?;

        let invite = self.invites.validate_pending(&input.token).await?;
        let summary = self.invites.summary(&invite).await?;

        Ok(RegistrationDraft {
            invite: Some(DraftInvite {
                token: invite.token,
                email: summary.email,
                organization_id: summary.organization_id,
                organization_name: summary.organization_name,
                role: summary.role,
            }),
            ..draft
        })
    }

    /// Invite path, final step: re-validate the token, then redeem with a new identity
    pub async fn complete_invite(
        &self,
        draft: &RegistrationDraft,
        profile: InviteProfile,
    ) -> DomainResult<AcceptedInvite> {
        let (Some(RegistrationMode::Invite), Some(pending)) = (draft.mode, draft.invite.as_ref())
        else {
            return Err(DomainError::StepOutOfOrder);
        };

        let invite = self.invites.validate_pending(&pending.token).await?;
        if self.identities.exists(&invite.email).await? {
            return Err(DomainError::EmailAlreadyRegistered);
        }

        self.invites.complete_redemption(&invite.token, profile).await
    }

    /// Re-check a resumed draft; an invite that stopped being pending sends
    /// the session back to the token step.
    pub async fn refresh(&self, draft: RegistrationDraft) -> DomainResult<RegistrationDraft> {
        let Some(pending) = draft.invite.as_ref() else {
            return Ok(draft);
        };

        match self.invites.validate_pending(&pending.token).await {
            Ok(_) => Ok(draft),
            Err(DomainError::Internal(e)) => Err(DomainError::Internal(e)),
            Err(reason) => {
                debug!(reason = reason.code(), "Dropping stale invite from registration draft");
                Ok(RegistrationDraft {
                    invite: None,
                    ..draft
                })
            }
        }
    }
}
