//! Domain errors raised by the membership services

use thiserror::Error;

use crate::utils::error::AppError;

/// Coarse error classification shared by every domain failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Expired,
    Authorization,
    AuthFailure,
    Internal,
}

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("{0}")]
    Validation(String),

    #[error("An account with this email already exists")]
    DuplicateIdentity,

    #[error("This email is already registered; log in instead")]
    EmailAlreadyRegistered,

    #[error("The identity is already a member of this organization")]
    DuplicateMembership,

    #[error("The organization already has an owner")]
    OwnerAlreadySet,

    #[error("The invite has already been accepted and cannot be revoked")]
    AlreadyAccepted,

    #[error("The invite has already been accepted")]
    InviteAlreadyAccepted,

    #[error("The invite was issued to a different email address")]
    EmailMismatch,

    #[error("Invite not found")]
    InviteNotFound,

    #[error("Membership not found")]
    MembershipNotFound,

    #[error("Organization not found")]
    OrganizationNotFound,

    #[error("Identity not found")]
    IdentityNotFound,

    #[error("The invite has expired")]
    InviteExpired,

    #[error("You do not have permission to perform this action")]
    Forbidden,

    #[error("Invalid credentials")]
    AuthFailure,

    #[error("Registration step submitted out of order")]
    StepOutOfOrder,

    #[error("The terms of use must be accepted")]
    TermsNotAccepted,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Validation(_)
            | DomainError::StepOutOfOrder
            | DomainError::TermsNotAccepted => ErrorKind::Validation,
            DomainError::DuplicateIdentity
            | DomainError::EmailAlreadyRegistered
            | DomainError::DuplicateMembership
            | DomainError::OwnerAlreadySet
            | DomainError::AlreadyAccepted
            | DomainError::InviteAlreadyAccepted
            | DomainError::EmailMismatch => ErrorKind::Conflict,
            DomainError::InviteNotFound
            | DomainError::MembershipNotFound
            | DomainError::OrganizationNotFound
            | DomainError::IdentityNotFound => ErrorKind::NotFound,
            DomainError::InviteExpired => ErrorKind::Expired,
            DomainError::Forbidden => ErrorKind::Authorization,
            DomainError::AuthFailure => ErrorKind::AuthFailure,
            DomainError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable code for API clients
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::Validation(_) => "validation",
            DomainError::DuplicateIdentity => "duplicate_identity",
            DomainError::EmailAlreadyRegistered => "email_already_registered",
            DomainError::DuplicateMembership => "duplicate_membership",
            DomainError::OwnerAlreadySet => "owner_already_set",
            DomainError::AlreadyAccepted => "already_accepted",
            DomainError::InviteAlreadyAccepted => "invite_already_accepted",
            DomainError::EmailMismatch => "email_mismatch",
            DomainError::InviteNotFound => "invite_not_found",
            DomainError::MembershipNotFound => "membership_not_found",
            DomainError::OrganizationNotFound => "organization_not_found",
            DomainError::IdentityNotFound => "identity_not_found",
            DomainError::InviteExpired => "invite_expired",
            DomainError::Forbidden => "forbidden",
            DomainError::AuthFailure => "auth_failure",
            DomainError::StepOutOfOrder => "step_out_of_order",
            DomainError::TermsNotAccepted => "terms_not_accepted",
            DomainError::Internal(_) => "internal",
        }
    }
}

impl From<validator::ValidationErrors> for DomainError {
    fn from(err: validator::ValidationErrors) -> Self {
        DomainError::Validation(err.to_string())
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        let message = err.to_string();
        match err.kind() {
            ErrorKind::Validation => AppError::ValidationError(message),
            ErrorKind::Conflict => AppError::Conflict(message),
            ErrorKind::NotFound => AppError::NotFound(message),
            ErrorKind::Expired => AppError::Gone(message),
            ErrorKind::Authorization => AppError::Forbidden(message),
            ErrorKind::AuthFailure => AppError::Unauthorized(message),
            ErrorKind::Internal => AppError::Internal(message),
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
