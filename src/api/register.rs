//! Registration wizard API endpoints
//!
//! The wizard session is identified by an HTTP-only cookie. Drafts live in
//! the draft store; a failed step leaves the stored draft untouched.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;

use crate::{
    api::auth::issue_token,
    models::{
        AuthResponse, ChooseModeRequest, CompanyStepInput, ConfirmInput, DraftView, InviteProfile,
        InviteTokenInput, Membership, Organization, RegistrationDraft, UserStepInput,
    },
    services::new_session_id,
    utils::error::AppResult,
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(current_step).delete(abandon))
        .route("/mode", post(choose_mode))
        .route("/company/user", post(submit_user))
        .route("/company/details", post(submit_company))
        .route("/company/confirm", post(confirm_company))
        .route("/invite/token", post(submit_invite_token))
        .route("/invite/profile", post(complete_invite))
}

#[derive(Debug, Serialize)]
pub struct RegistrationComplete {
    #[serde(flatten)]
    pub auth: AuthResponse,
    pub organization_id: uuid::Uuid,
    pub membership: Membership,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<Organization>,
}

/// Session id from the cookie, or a fresh one
fn session(state: &AppState, jar: CookieJar) -> (CookieJar, String) {
    let name = state.config.registration.session_cookie.clone();
    if let Some(existing) = jar.get(&name) {
        let id = existing.value().to_string();
        return (jar, id);
    }

    let id = new_session_id();
    let cookie = Cookie::build((name, id.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    (jar.add(cookie), id)
}

fn end_session(state: &AppState, jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(state.config.registration.session_cookie.clone()).path("/"))
}

async fn load(state: &AppState, session_id: &str) -> RegistrationDraft {
    state.drafts.get(session_id).await.unwrap_or_default()
}

async fn store(
    state: &AppState,
    jar: CookieJar,
    session_id: &str,
    draft: RegistrationDraft,
) -> (CookieJar, Json<DraftView>) {
    state.drafts.put(session_id, draft.clone()).await;
    (jar, Json(DraftView::from(draft)))
}

/// Where the session left off
///
/// GET /api/v1/register
async fn current_step(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<DraftView>)> {
    let stored = match jar.get(&state.config.registration.session_cookie) {
        Some(cookie) => {
            let session_id = cookie.value().to_string();
            state.drafts.get(&session_id).await.map(|draft| (session_id, draft))
        }
        None => None,
    };

    // Reading never opens a session; the first chosen mode does
    let Some((session_id, draft)) = stored else {
        return Ok((jar, Json(DraftView::from(RegistrationDraft::default()))));
    };

    let draft = state.wizard().refresh(draft).await?;
    Ok(store(&state, jar, &session_id, draft).await)
}

/// POST /api/v1/register/mode
async fn choose_mode(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<ChooseModeRequest>,
) -> AppResult<(CookieJar, Json<DraftView>)> {
    let (jar, session_id) = session(&state, jar);
    let draft = state.wizard().choose_mode(payload.mode);
    Ok(store(&state, jar, &session_id, draft).await)
}

/// POST /api/v1/register/company/user
async fn submit_user(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<UserStepInput>,
) -> AppResult<(CookieJar, Json<DraftView>)> {
    let (jar, session_id) = session(&state, jar);
    let draft = load(&state, &session_id).await;
    let draft = state.wizard().submit_user(draft, payload).await?;
    Ok(store(&state, jar, &session_id, draft).await)
}

/// POST /api/v1/register/company/details
async fn submit_company(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<CompanyStepInput>,
) -> AppResult<(CookieJar, Json<DraftView>)> {
    let (jar, session_id) = session(&state, jar);
    let draft = load(&state, &session_id).await;
    let draft = state.wizard().submit_company(draft, payload)?;
    Ok(store(&state, jar, &session_id, draft).await)
}

/// Create the organization, its owner and the owner membership
///
/// POST /api/v1/register/company/confirm
async fn confirm_company(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<ConfirmInput>,
) -> AppResult<(StatusCode, CookieJar, Json<RegistrationComplete>)> {
    let (jar, session_id) = session(&state, jar);
    let draft = load(&state, &session_id).await;
    let registration = state.wizard().confirm_company(&draft, payload).await?;

    state.drafts.clear(&session_id).await;
    let response = RegistrationComplete {
        organization_id: registration.organization.id,
        membership: registration.membership,
        organization: Some(registration.organization),
        auth: issue_token(&state, registration.identity)?,
    };
    Ok((StatusCode::CREATED, end_session(&state, jar), Json(response)))
}

/// POST /api/v1/register/invite/token
async fn submit_invite_token(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<InviteTokenInput>,
) -> AppResult<(CookieJar, Json<DraftView>)> {
    let (jar, session_id) = session(&state, jar);
    let draft = load(&state, &session_id).await;
    let draft = state.wizard().submit_invite_token(draft, payload).await?;
    Ok(store(&state, jar, &session_id, draft).await)
}

/// Create the invitee's identity and membership
///
/// POST /api/v1/register/invite/profile
async fn complete_invite(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<InviteProfile>,
) -> AppResult<(StatusCode, CookieJar, Json<RegistrationComplete>)> {
    let (jar, session_id) = session(&state, jar);
    let draft = load(&state, &session_id).await;
    let accepted = state.wizard().complete_invite(&draft, payload).await?;

    state.drafts.clear(&session_id).await;
    let response = RegistrationComplete {
        organization_id: accepted.invite.organization_id,
        membership: accepted.membership,
        organization: None,
        auth: issue_token(&state, accepted.identity)?,
    };
    Ok((StatusCode::CREATED, end_session(&state, jar), Json(response)))
}

/// Abandon the wizard; nothing durable was written
///
/// DELETE /api/v1/register
async fn abandon(State(state): State<AppState>, jar: CookieJar) -> (StatusCode, CookieJar) {
    if let Some(cookie) = jar.get(&state.config.registration.session_cookie) {
        state.drafts.clear(cookie.value()).await;
    }
    (StatusCode::NO_CONTENT, end_session(&state, jar))
}
