//! Invite model
//!
//! An invite is a time-bounded offer of a membership, redeemed through an
//! opaque token. Its status is derived from timestamps, never stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{Identity, Membership, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InviteStatus {
    Pending,
    Expired,
    Revoked,
    Accepted,
}

impl std::fmt::Display for InviteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InviteStatus::Pending => write!(f, "pending"),
            InviteStatus::Expired => write!(f, "expired"),
            InviteStatus::Revoked => write!(f, "revoked"),
            InviteStatus::Accepted => write!(f, "accepted"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invite {
    pub id: Uuid,
    pub organization_id: Uuid,
    /// Normalized invitee email
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing)]
    pub token: String,
    pub invited_by: Option<Uuid>,
    pub expires_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Invite {
    pub fn status_at(&self, now: DateTime<Utc>) -> InviteStatus {
        if self.accepted_at.is_some() {
            InviteStatus::Accepted
        } else if self.revoked_at.is_some() {
            InviteStatus::Revoked
        } else if self.expires_at <= now {
            InviteStatus::Expired
        } else {
            InviteStatus::Pending
        }
    }

    pub fn status(&self) -> InviteStatus {
        self.status_at(Utc::now())
    }

    pub fn is_pending(&self) -> bool {
        self.status() == InviteStatus::Pending
    }
}

/// Invite as rendered to administrators, with its derived status
#[derive(Debug, Clone, Serialize)]
pub struct InviteView {
    #[serde(flatten)]
    pub invite: Invite,
    pub status: InviteStatus,
}

impl From<Invite> for InviteView {
    fn from(invite: Invite) -> Self {
        let status = invite.status();
        Self { invite, status }
    }
}

/// What an invitee is shown before completing a profile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InviteSummary {
    pub organization_id: Uuid,
    pub organization_name: String,
    pub email: String,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

/// Input for issuing an invite
#[derive(Debug, Clone)]
pub struct IssueInvite {
    pub organization_id: Uuid,
    pub email: String,
    /// Free-form role; coerced to `viewer` when unknown
    pub role: Option<String>,
    /// Free-form validity in days; coerced to the default when not a positive integer
    pub days_valid: Option<String>,
    pub invited_by: Option<Uuid>,
}

/// Outcome of a redemption attempt that did not fail
#[derive(Debug, Clone)]
pub enum Redemption {
    /// The acting identity now holds a membership and the invite is stamped
    Accepted { invite: Invite, membership: Membership },
    /// An account already exists for the invitee; nothing was applied
    RequiresLogin { email: String },
    /// No account exists; a profile must be supplied to finish
    ProfileRequired(InviteSummary),
}

/// Profile supplied by an invitee without an account
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct InviteProfile {
    #[validate(length(min = 1, max = 80, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 80, message = "Last name is required"))]
    pub last_name: String,
    #[validate(length(min = 6, max = 72, message = "Password must be between 6 and 72 characters"))]
    pub password: String,
}

/// Result of a completed redemption that created a new identity
#[derive(Debug, Clone, Serialize)]
pub struct AcceptedInvite {
    pub identity: Identity,
    pub membership: Membership,
    pub invite: Invite,
}

/// Request to issue an invite
#[derive(Debug, Clone, Deserialize)]
pub struct CreateInviteRequest {
    pub email: String,
    #[serde(default)]
    pub role: Option<String>,
    /// Accepts a number or a string; anything unusable falls back to the default
    #[serde(default)]
    pub days_valid: Option<serde_json::Value>,
}

impl CreateInviteRequest {
    pub fn days_valid_raw(&self) -> Option<String> {
        match &self.days_valid {
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateInviteResponse {
    pub invite: InviteView,
    pub invitation_url: String,
}
