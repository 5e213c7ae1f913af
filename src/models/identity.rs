//! Identity model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A person who can sign in and hold memberships
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    /// Normalized (trimmed, lower-case) email; immutable after creation
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub job_title: Option<String>,
    pub phone: Option<String>,
    pub timezone: String,
    pub locale: String,
    pub created_at: DateTime<Utc>,
}

impl Identity {
    /// Build a new identity from an already normalized email and a password digest
    pub fn new(email: String, password_hash: String, profile: IdentityProfile) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            password_hash,
            first_name: profile.first_name,
            last_name: profile.last_name,
            job_title: profile.job_title,
            phone: profile.phone,
            timezone: profile.timezone,
            locale: profile.locale,
            created_at: Utc::now(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Profile fields collected at sign-up
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdentityProfile {
    pub first_name: String,
    pub last_name: String,
    pub job_title: Option<String>,
    pub phone: Option<String>,
    pub timezone: String,
    pub locale: String,
}

/// Input for creating an identity with a plaintext password
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub email: String,
    pub profile: IdentityProfile,
    pub password: String,
}

/// Login request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 160, message = "Email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Authentication response with an access token
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub identity: Identity,
}
