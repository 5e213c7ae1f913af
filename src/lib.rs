//! AppZero Accounts Library
//!
//! Identities, organizations, memberships, invitations and the registration
//! wizard behind the AppZero sign-up and team administration flows.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

pub mod api;
pub mod config;
pub mod db;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

pub use config::AppConfig;
pub use db::DbPool;
pub use middleware::{auth_middleware, AuthUser, Claims, TenantContext};
use services::{
    Argon2Credentials, AuthorizationGate, CredentialStore, DraftStore, IdentityRegistry,
    InMemoryDraftStore, InviteEngine, InviteNotifier, LogNotifier, MembershipLedger,
    OrganizationRegistry, RegistrationWizard, TeamService,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Database connection pool
    pub db: DbPool,
    /// Password hashing
    pub credentials: Arc<dyn CredentialStore>,
    /// Registration wizard sessions
    pub drafts: Arc<dyn DraftStore>,
    /// Invitation link delivery
    pub notifier: Arc<dyn InviteNotifier>,
}

impl AppState {
    /// State with the default collaborators: Argon2 credentials, an
    /// in-memory draft store and a logging notifier
    pub fn new(config: AppConfig, db: DbPool) -> Result<Self> {
        let credentials = Arc::new(Argon2Credentials::from_config(&config.auth)?);
        let drafts = Arc::new(InMemoryDraftStore::new(Duration::from_secs(
            config.registration.draft_ttl_minutes * 60,
        )));
        Ok(Self::with_collaborators(
            config,
            db,
            credentials,
            drafts,
            Arc::new(LogNotifier),
        ))
    }

    pub fn with_collaborators(
        config: AppConfig,
        db: DbPool,
        credentials: Arc<dyn CredentialStore>,
        drafts: Arc<dyn DraftStore>,
        notifier: Arc<dyn InviteNotifier>,
    ) -> Self {
        Self {
            config,
            db,
            credentials,
            drafts,
            notifier,
        }
    }

    pub fn identities(&self) -> IdentityRegistry {
        IdentityRegistry::new(self.db.clone(), self.credentials.clone())
    }

    pub fn organizations(&self) -> OrganizationRegistry {
        OrganizationRegistry::new(self.db.clone())
    }

    pub fn memberships(&self) -> MembershipLedger {
        MembershipLedger::new(self.db.clone())
    }

    pub fn gate(&self) -> AuthorizationGate {
        AuthorizationGate::new(self.db.clone())
    }

    pub fn invites(&self) -> InviteEngine {
        InviteEngine::new(
            self.db.clone(),
            self.credentials.clone(),
            self.config.invites.clone(),
            self.config.registration.clone(),
        )
    }

    pub fn team(&self) -> TeamService {
        TeamService::new(self.db.clone(), self.invites(), self.notifier.clone())
    }

    pub fn wizard(&self) -> RegistrationWizard {
        RegistrationWizard::new(
            self.db.clone(),
            self.credentials.clone(),
            self.config.registration.clone(),
            self.invites(),
        )
    }
}
