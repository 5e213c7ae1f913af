//! Identity registry
//!
//! Creates identities and looks them up by normalized email. Credential
//! checks fail the same way whether or not the account exists.

use std::sync::Arc;

use sqlx::SqliteConnection;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::{is_unique_violation, DbPool, IdentityRepository};
use crate::models::{Identity, NewIdentity};
use crate::services::credentials::CredentialStore;
use crate::services::error::{DomainError, DomainResult};
use crate::utils::validation::{normalize_email, validate_email};

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_PASSWORD_LEN: usize = 72;

pub fn validate_password(password: &str) -> DomainResult<()> {
    let len = password.chars().count();
    if !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len) {
        return Err(DomainError::Validation(format!(
            "Password must be between {} and {} characters",
            MIN_PASSWORD_LEN, MAX_PASSWORD_LEN
        )));
    }
    Ok(())
}

#[derive(Clone)]
pub struct IdentityRegistry {
    pool: DbPool,
    credentials: Arc<dyn CredentialStore>,
}

impl IdentityRegistry {
    pub fn new(pool: DbPool, credentials: Arc<dyn CredentialStore>) -> Self {
        Self { pool, credentials }
    }

    /// Create an identity, storing only the password digest
    pub async fn create(&self, new: NewIdentity) -> DomainResult<Identity> {
        let email = normalize_email(&new.email);
        if !validate_email(&email) {
            return Err(DomainError::Validation("Invalid email address".to_string()));
        }
        validate_password(&new.password)?;

        let repo = IdentityRepository::new(&self.pool);
        if repo.email_exists(&email).await? {
            return Err(DomainError::DuplicateIdentity);
        }

        let digest = self.credentials.hash(&new.password)?;
        let identity = Identity::new(email, digest, new.profile);

        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| DomainError::Internal(e.into()))?;
        Self::insert_in(&mut conn, &identity).await?;

        info!(identity_id = %identity.id, "Identity created");
        Ok(identity)
    }

    /// Insert a prepared identity on an open connection or transaction
    pub async fn insert_in(conn: &mut SqliteConnection, identity: &Identity) -> DomainResult<()> {
        IdentityRepository::insert(conn, identity)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    DomainError::DuplicateIdentity
                } else {
                    DomainError::Internal(e)
                }
            })
    }

    pub async fn find_by_email(&self, email: &str) -> DomainResult<Option<Identity>> {
        let email = normalize_email(email);
        debug!("Looking up identity by email");
        Ok(IdentityRepository::new(&self.pool)
            .get_by_email(&email)
            .await?)
    }

    pub async fn exists(&self, email: &str) -> DomainResult<bool> {
        let email = normalize_email(email);
        Ok(IdentityRepository::new(&self.pool)
            .email_exists(&email)
            .await?)
    }

    pub async fn get(&self, id: Uuid) -> DomainResult<Option<Identity>> {
        Ok(IdentityRepository::new(&self.pool).get_by_id(id).await?)
    }

    /// Check an email/password pair.
    ///
    /// Unknown email and wrong password both yield `AuthFailure`, and both
    /// paths run one password verification.
    pub async fn verify_credentials(&self, email: &str, password: &str) -> DomainResult<Identity> {
        match self.find_by_email(email).await? {
            Some(identity) if self.credentials.verify(&identity.password_hash, password) => {
                Ok(identity)
            }
            Some(identity) => {
                warn!(identity_id = %identity.id, "Credential check failed");
                Err(DomainError::AuthFailure)
            }
            None => {
                self.credentials.verify_absent(password);
                warn!("Credential check failed");
                Err(DomainError::AuthFailure)
            }
        }
    }
}
