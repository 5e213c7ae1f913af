//! Organization registry

use sqlx::SqliteConnection;
use tracing::info;
use uuid::Uuid;

use crate::db::{DbPool, OrganizationRepository};
use crate::models::{NewOrganization, Organization};
use crate::services::error::{DomainError, DomainResult};
use crate::utils::validation::{non_blank, normalize_country, validate_country};

#[derive(Clone)]
pub struct OrganizationRegistry {
    pool: DbPool,
}

impl OrganizationRegistry {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Normalize and validate organization details.
    ///
    /// Duplicate legal names and tax ids are permitted.
    pub fn prepare(details: NewOrganization) -> DomainResult<Organization> {
        let legal_name = details.legal_name.trim().to_string();
        if legal_name.is_empty() {
            return Err(DomainError::Validation("Legal name is required".to_string()));
        }
        let country = normalize_country(&details.country);
        if !validate_country(&country) {
            return Err(DomainError::Validation(format!(
                "Invalid country code: {}",
                details.country
            )));
        }

        Ok(Organization::new(NewOrganization {
            legal_name,
            trade_name: non_blank(details.trade_name),
            tax_id: non_blank(details.tax_id),
            country,
            timezone: details.timezone.trim().to_string(),
            plan: details.plan,
            industry: non_blank(details.industry),
        }))
    }

    pub async fn create(&self, details: NewOrganization) -> DomainResult<Organization> {
        let org = Self::prepare(details)?;
        OrganizationRepository::new(&self.pool).create(&org).await?;
        info!(organization_id = %org.id, "Organization created");
        Ok(org)
    }

    pub async fn insert_in(conn: &mut SqliteConnection, org: &Organization) -> DomainResult<()> {
        Ok(OrganizationRepository::insert(conn, org).await?)
    }

    pub async fn get(&self, id: Uuid) -> DomainResult<Option<Organization>> {
        Ok(OrganizationRepository::new(&self.pool).get_by_id(id).await?)
    }

    pub async fn list_for_identity(&self, identity_id: Uuid) -> DomainResult<Vec<Organization>> {
        Ok(OrganizationRepository::new(&self.pool)
            .list_for_identity(identity_id)
            .await?)
    }

    /// Set the owner once. A second call fails with `OwnerAlreadySet`.
    pub async fn set_owner(&self, org_id: Uuid, identity_id: Uuid) -> DomainResult<()> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| DomainError::Internal(e.into()))?;
        if OrganizationRepository::set_owner(&mut conn, org_id, identity_id).await? {
            info!(organization_id = %org_id, identity_id = %identity_id, "Organization owner set");
            return Ok(());
        }
        match self.get(org_id).await? {
            Some(_) => Err(DomainError::OwnerAlreadySet),
            None => Err(DomainError::OrganizationNotFound),
        }
    }

    /// Transactional variant of [`set_owner`](Self::set_owner) for an organization
    /// created on the same connection.
    pub async fn set_owner_in(
        conn: &mut SqliteConnection,
        org_id: Uuid,
        identity_id: Uuid,
    ) -> DomainResult<()> {
        if OrganizationRepository::set_owner(conn, org_id, identity_id).await? {
            Ok(())
        } else {
            Err(DomainError::OwnerAlreadySet)
        }
    }
}
