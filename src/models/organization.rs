//! Organization (tenant) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    pub legal_name: String,
    pub trade_name: Option<String>,
    pub tax_id: Option<String>,
    /// ISO-3166 alpha-2, upper-case
    pub country: String,
    pub timezone: String,
    pub plan: String,
    pub industry: Option<String>,
    /// Set exactly once, when registration completes
    pub owner_identity_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Organization {
    pub fn new(details: NewOrganization) -> Self {
        Self {
            id: Uuid::new_v4(),
            legal_name: details.legal_name,
            trade_name: details.trade_name,
            tax_id: details.tax_id,
            country: details.country,
            timezone: details.timezone,
            plan: details.plan,
            industry: details.industry,
            owner_identity_id: None,
            created_at: Utc::now(),
        }
    }

    /// Trade name when present, legal name otherwise
    pub fn display_name(&self) -> &str {
        self.trade_name.as_deref().unwrap_or(&self.legal_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrganization {
    pub legal_name: String,
    pub trade_name: Option<String>,
    pub tax_id: Option<String>,
    pub country: String,
    pub timezone: String,
    pub plan: String,
    pub industry: Option<String>,
}
