//! API routes and handlers
//!
//! This module defines all API endpoints and their routing.

use axum::Router;

use crate::AppState;

mod auth;
mod invites;
mod organizations;
mod register;

/// Public API routes (no authentication required)
///
/// These are the credential-bearing endpoints; the router applies the
/// stricter rate limit and optional authentication to all of them.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::public_routes())
        .nest("/register", register::routes())
        .nest("/invites", invites::public_routes())
}

/// Protected API routes (authentication required)
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::protected_routes())
        .nest("/invites", invites::routes())
        .nest("/organizations", organizations::routes())
}
