//! Registration wizard draft and step inputs
//!
//! The draft is a plain value: each wizard step takes the current draft and
//! its input and returns the next draft. It is never written to the database.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{Identity, Membership, Organization, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationMode {
    /// Create a new organization and become its owner
    Company,
    /// Join an existing organization through an invite
    Invite,
}

/// Where a (possibly resumed) wizard session continues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WizardStep {
    ModeSelect,
    CompanyUser,
    CompanyDetails,
    CompanyConfirm,
    InviteToken,
    InviteProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DraftUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub job_title: Option<String>,
    pub phone: Option<String>,
    pub timezone: String,
    /// Digest of the chosen password; the plaintext is never kept
    #[serde(skip_serializing, default)]
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DraftCompany {
    pub legal_name: String,
    pub trade_name: Option<String>,
    pub tax_id: Option<String>,
    pub country: String,
    pub timezone: String,
    pub industry: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DraftInvite {
    #[serde(skip_serializing, default)]
    pub token: String,
    pub email: String,
    pub organization_id: Uuid,
    pub organization_name: String,
    pub role: Role,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RegistrationDraft {
    pub mode: Option<RegistrationMode>,
    pub user: Option<DraftUser>,
    pub company: Option<DraftCompany>,
    pub invite: Option<DraftInvite>,
}

impl RegistrationDraft {
    pub fn new(mode: RegistrationMode) -> Self {
        Self {
            mode: Some(mode),
            ..Self::default()
        }
    }

    pub fn next_step(&self) -> WizardStep {
        match self.mode {
            None => WizardStep::ModeSelect,
            Some(RegistrationMode::Company) => match (&self.user, &self.company) {
                (None, _) => WizardStep::CompanyUser,
                (Some(_), None) => WizardStep::CompanyDetails,
                (Some(_), Some(_)) => WizardStep::CompanyConfirm,
            },
            Some(RegistrationMode::Invite) => match self.invite {
                None => WizardStep::InviteToken,
                Some(_) => WizardStep::InviteProfile,
            },
        }
    }
}

/// Draft plus the step it is waiting on, as returned to the client
#[derive(Debug, Clone, Serialize)]
pub struct DraftView {
    pub step: WizardStep,
    pub draft: RegistrationDraft,
}

impl From<RegistrationDraft> for DraftView {
    fn from(draft: RegistrationDraft) -> Self {
        Self {
            step: draft.next_step(),
            draft,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChooseModeRequest {
    pub mode: RegistrationMode,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UserStepInput {
    #[validate(
        email(message = "Invalid email format"),
        length(max = 160, message = "Email must be at most 160 characters")
    )]
    pub email: String,
    #[validate(length(min = 1, max = 80, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 80, message = "Last name is required"))]
    pub last_name: String,
    #[validate(length(max = 120))]
    pub job_title: Option<String>,
    #[validate(length(max = 40))]
    pub phone: Option<String>,
    #[validate(length(max = 64))]
    pub timezone: Option<String>,
    #[validate(length(min = 6, max = 72, message = "Password must be between 6 and 72 characters"))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CompanyStepInput {
    #[validate(length(min = 1, max = 200, message = "Legal name is required"))]
    pub legal_name: String,
    #[validate(length(max = 200))]
    pub trade_name: Option<String>,
    #[validate(length(max = 32))]
    pub tax_id: Option<String>,
    #[validate(length(min = 2, max = 2, message = "Country must be a two-letter code"))]
    pub country: Option<String>,
    #[validate(length(max = 64))]
    pub timezone: Option<String>,
    #[validate(length(max = 80))]
    pub industry: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfirmInput {
    #[serde(default)]
    pub accept_terms: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct InviteTokenInput {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
}

/// Everything created by a completed company registration
#[derive(Debug, Clone, Serialize)]
pub struct CompanyRegistration {
    pub organization: Organization,
    pub identity: Identity,
    pub membership: Membership,
}
