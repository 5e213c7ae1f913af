//! Business logic services

pub mod authorization;
pub mod credentials;
pub mod error;
pub mod identity;
pub mod invite;
pub mod membership;
pub mod notification;
pub mod organization;
pub mod registration;
pub mod session;
pub mod team;

pub use authorization::AuthorizationGate;
pub use credentials::{Argon2Credentials, CredentialStore};
pub use error::{DomainError, DomainResult, ErrorKind};
pub use identity::IdentityRegistry;
pub use invite::InviteEngine;
pub use membership::MembershipLedger;
pub use notification::{InviteNotifier, LogNotifier};
pub use organization::OrganizationRegistry;
pub use registration::RegistrationWizard;
pub use session::{new_session_id, spawn_draft_cleanup, DraftStore, InMemoryDraftStore};
pub use team::{IssuedInvite, TeamOverview, TeamService};
