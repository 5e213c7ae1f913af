//! Middleware components
//!
//! This module contains middleware for:
//! - Authentication (JWT)
//! - Tenant resolution
//! - Rate limiting

pub mod auth;
pub mod rate_limit;
pub mod tenant;

pub use auth::{auth_middleware, optional_auth_middleware, AuthUser, Claims};
pub use rate_limit::{rate_limit_middleware, RateLimitState};
pub use tenant::TenantContext;
