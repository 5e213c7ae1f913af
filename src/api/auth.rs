//! Authentication API endpoints

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use validator::Validate;

use crate::{
    middleware::auth::{create_access_token, AuthUser},
    models::{AuthResponse, Identity, LoginRequest, Organization},
    utils::error::{AppError, AppResult},
    AppState,
};

pub fn public_routes() -> Router<AppState> {
    Router::new().route("/login", post(login))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_current_identity))
}

#[derive(Debug, Serialize)]
pub struct CurrentIdentity {
    pub identity: Identity,
    pub organizations: Vec<Organization>,
}

/// Issue an access token for an identity
pub(crate) fn issue_token(state: &AppState, identity: Identity) -> AppResult<AuthResponse> {
    let access_token = create_access_token(
        &identity.id,
        &identity.email,
        &state.config.auth.jwt_secret,
        state.config.auth.token_expiry_hours,
    )
    .map_err(|e| AppError::internal(format!("Failed to create access token: {}", e)))?;

    Ok(AuthResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: state.config.auth.token_expiry_hours * 3600,
        identity,
    })
}

/// Login handler
///
/// POST /api/v1/auth/login
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    payload.validate()?;

    let identity = state
        .identities()
        .verify_credentials(&payload.email, &payload.password)
        .await?;

    Ok(Json(issue_token(&state, identity)?))
}

/// Current identity and the organizations it belongs to
///
/// GET /api/v1/auth/me
async fn get_current_identity(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<CurrentIdentity>> {
    let identity = state
        .identities()
        .get(auth_user.id)
        .await?
        .ok_or_else(|| AppError::unauthorized("Identity no longer exists"))?;
    let organizations = state.organizations().list_for_identity(identity.id).await?;

    Ok(Json(CurrentIdentity {
        identity,
        organizations,
    }))
}
