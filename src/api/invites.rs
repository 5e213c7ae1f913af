//! Invitation API endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    api::auth::issue_token,
    middleware::{AuthUser, TenantContext},
    models::{
        AuthResponse, CreateInviteRequest, CreateInviteResponse, InviteProfile, InviteSummary,
        InviteView, Membership, Redemption,
    },
    utils::error::{AppError, AppResult},
    AppState,
};

/// Invite acceptance; authentication is optional
pub fn public_routes() -> Router<AppState> {
    Router::new().route("/accept", get(preview_invite).post(accept_invite))
}

/// Team invite administration for the active organization
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_pending).post(create_invite))
        .route("/history", get(list_history))
        .route("/{id}/revoke", post(revoke_invite))
}

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct AcceptInviteRequest {
    pub token: String,
    /// Required only when the invitee has no account yet
    #[serde(default)]
    pub profile: Option<InviteProfile>,
}

#[derive(Debug, Serialize)]
pub struct InvitePreview {
    #[serde(flatten)]
    pub invite: InviteSummary,
    pub account_exists: bool,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AcceptOutcome {
    Accepted {
        invite: InviteView,
        membership: Membership,
    },
    Registered {
        auth: AuthResponse,
        membership: Membership,
    },
    RequiresLogin {
        email: String,
    },
    ProfileRequired {
        invite: InviteSummary,
    },
}

impl IntoResponse for AcceptOutcome {
    fn into_response(self) -> Response {
        let status = match &self {
            AcceptOutcome::Registered { .. } => StatusCode::CREATED,
            _ => StatusCode::OK,
        };
        (status, Json(self)).into_response()
    }
}

/// Show what a token grants before accepting it
///
/// GET /api/v1/invites/accept?token=...
async fn preview_invite(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> AppResult<Json<InvitePreview>> {
    let engine = state.invites();
    let invite = engine.validate_pending(&query.token).await?;
    let account_exists = state.identities().exists(&invite.email).await?;

    Ok(Json(InvitePreview {
        invite: engine.summary(&invite).await?,
        account_exists,
    }))
}

/// Redeem a token
///
/// Signed-in callers redeem for themselves. Anonymous callers either supply
/// a profile to create their account or are told what is missing.
///
/// POST /api/v1/invites/accept
async fn accept_invite(
    State(state): State<AppState>,
    auth_user: Option<AuthUser>,
    Json(payload): Json<AcceptInviteRequest>,
) -> AppResult<AcceptOutcome> {
    let engine = state.invites();

    if let Some(auth_user) = auth_user {
        let identity = state
            .identities()
            .get(auth_user.id)
            .await?
            .ok_or_else(|| AppError::unauthorized("Identity no longer exists"))?;
        return match engine.redeem(&payload.token, Some(&identity)).await? {
            Redemption::Accepted { invite, membership } => Ok(AcceptOutcome::Accepted {
                invite: invite.into(),
                membership,
            }),
            _ => Err(AppError::internal("Redemption was not applied")),
        };
    }

    if let Some(profile) = payload.profile {
        let accepted = engine.complete_redemption(&payload.token, profile).await?;
        return Ok(AcceptOutcome::Registered {
            auth: issue_token(&state, accepted.identity)?,
            membership: accepted.membership,
        });
    }

    Ok(match engine.redeem(&payload.token, None).await? {
        Redemption::RequiresLogin { email } => AcceptOutcome::RequiresLogin { email },
        Redemption::ProfileRequired(invite) => AcceptOutcome::ProfileRequired { invite },
        Redemption::Accepted { invite, membership } => AcceptOutcome::Accepted {
            invite: invite.into(),
            membership,
        },
    })
}

/// GET /api/v1/invites
async fn list_pending(
    State(state): State<AppState>,
    tenant: TenantContext,
) -> AppResult<Json<Vec<InviteView>>> {
    let overview = state
        .team()
        .overview(tenant.identity_id, tenant.organization_id)
        .await?;
    Ok(Json(overview.pending_invites))
}

/// POST /api/v1/invites
async fn create_invite(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(payload): Json<CreateInviteRequest>,
) -> AppResult<(StatusCode, Json<CreateInviteResponse>)> {
    let days_valid = payload.days_valid_raw();
    let issued = state
        .team()
        .invite_member(
            tenant.identity_id,
            tenant.organization_id,
            payload.email,
            payload.role,
            days_valid,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateInviteResponse {
            invite: issued.invite.into(),
            invitation_url: issued.invitation_url,
        }),
    ))
}

/// POST /api/v1/invites/{id}/revoke
async fn revoke_invite(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<String>,
) -> AppResult<Json<InviteView>> {
    let invite_id =
        Uuid::parse_str(&id).map_err(|_| AppError::bad_request("Invalid invite ID"))?;
    let invite = state
        .team()
        .revoke_invite(tenant.identity_id, tenant.organization_id, invite_id)
        .await?;
    Ok(Json(invite.into()))
}

/// Recently accepted invites
///
/// GET /api/v1/invites/history
async fn list_history(
    State(state): State<AppState>,
    tenant: TenantContext,
) -> AppResult<Json<Vec<InviteView>>> {
    let history = state
        .team()
        .invite_history(tenant.identity_id, tenant.organization_id)
        .await?;
    Ok(Json(history))
}
