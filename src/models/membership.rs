//! Membership model and the closed role set

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role held by an identity inside an organization.
///
/// Variants are declared from least to most privileged so the derived
/// ordering matches privilege: owner > admin > manager > operator > viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Viewer,
    Operator,
    Manager,
    Admin,
    Owner,
}

/// Roles allowed to issue and revoke invites and manage the team
pub const TEAM_MANAGERS: &[Role] = &[Role::Owner, Role::Admin];

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Owner,
        Role::Admin,
        Role::Manager,
        Role::Operator,
        Role::Viewer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Operator => "operator",
            Role::Viewer => "viewer",
        }
    }

    /// Lenient parse used when issuing invites: anything outside the
    /// closed set becomes `Viewer`.
    pub fn parse_or_viewer(s: &str) -> Role {
        s.parse().unwrap_or(Role::Viewer)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "owner" => Ok(Role::Owner),
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "operator" => Ok(Role::Operator),
            "viewer" => Ok(Role::Viewer),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// Role-bearing link between an identity and an organization
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Membership {
    pub id: Uuid,
    pub identity_id: Uuid,
    pub organization_id: Uuid,
    pub role: Role,
    pub is_active: bool,
    pub joined_at: DateTime<Utc>,
}

impl Membership {
    pub fn new(identity_id: Uuid, organization_id: Uuid, role: Role, is_active: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            identity_id,
            organization_id,
            role,
            is_active,
            joined_at: Utc::now(),
        }
    }
}

/// Active member as listed on the team page
#[derive(Debug, Clone, Serialize)]
pub struct TeamMember {
    pub membership_id: Uuid,
    pub identity_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub joined_at: DateTime<Utc>,
}
