//! HTTP API tests

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

use appzero_accounts::models::Role;

use crate::common::*;

#[tokio::test]
async fn test_company_registration_over_http() {
    let app = TestApp::new().await;

    let resp = app
        .post_json("/api/v1/register/mode", json!({ "mode": "company" }))
        .await;
    resp.assert_ok();
    let cookie = resp.cookie("reg_session").expect("session cookie");
    let body: Value = resp.json();
    assert_eq!(body["step"], "company-user");

    let ctx = RequestContext::cookie(&cookie);
    let resp = app
        .send(
            Method::POST,
            "/api/v1/register/company/user",
            Some(json!({
                "email": "Ana@Acme.com",
                "first_name": "Ana",
                "last_name": "Souza",
                "password": TEST_PASSWORD,
            })),
            ctx,
        )
        .await;
    resp.assert_ok();
    let body: Value = resp.json();
    assert_eq!(body["step"], "company-details");
    assert!(body["draft"]["user"].get("password_hash").is_none());

    let resp = app
        .send(
            Method::POST,
            "/api/v1/register/company/details",
            Some(json!({ "legal_name": "Acme Ltda", "country": "br" })),
            ctx,
        )
        .await;
    resp.assert_ok();

    // Resuming the session lands on the confirmation step
    let resp = app
        .send(Method::GET, "/api/v1/register", None, ctx)
        .await;
    resp.assert_ok();
    assert_eq!(resp.json::<Value>()["step"], "company-confirm");

    let resp = app
        .send(
            Method::POST,
            "/api/v1/register/company/confirm",
            Some(json!({ "accept_terms": true })),
            ctx,
        )
        .await;
    resp.assert_created();
    let body: Value = resp.json();
    assert!(body["access_token"].as_str().is_some());
    assert_eq!(body["identity"]["email"], "ana@acme.com");
    assert_eq!(body["membership"]["role"], "owner");
    assert_eq!(body["organization"]["legal_name"], "Acme Ltda");

    assert_eq!(app.count("organizations").await, 1);
    assert_eq!(app.count("memberships").await, 1);
}

#[tokio::test]
async fn test_registration_step_out_of_order() {
    let app = TestApp::new().await;

    let resp = app
        .post_json(
            "/api/v1/register/company/confirm",
            json!({ "accept_terms": true }),
        )
        .await;
    resp.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(app.count("organizations").await, 0);
}

#[tokio::test]
async fn test_reading_registration_opens_no_session() {
    let app = TestApp::new().await;

    for _ in 0..3 {
        let resp = app.get("/api/v1/register").await;
        resp.assert_ok();
        assert_eq!(resp.json::<Value>()["step"], "mode-select");
        assert!(resp.cookie("reg_session").is_none());
    }

    let resp = app
        .send(
            Method::GET,
            "/api/v1/register",
            None,
            RequestContext::cookie("reg_session=made-up-session"),
        )
        .await;
    assert_eq!(resp.json::<Value>()["step"], "mode-select");
    assert!(resp.cookie("reg_session").is_none());
}

#[tokio::test]
async fn test_huge_invite_validity_falls_back_to_default() {
    let app = TestApp::new().await;
    let reg = app.register_company("owner@acme.com").await;
    let token = app.token_for(&reg.identity);
    let owner = RequestContext::bearer(&token).tenant(reg.organization.id);

    let resp = app
        .send(
            Method::POST,
            "/api/v1/invites",
            Some(json!({ "email": "bob@x.com", "days_valid": 100000000 })),
            owner,
        )
        .await;
    resp.assert_created();
    assert_eq!(resp.json::<Value>()["invite"]["status"], "pending");

    let invite = app
        .state
        .invites()
        .list_pending(reg.organization.id)
        .await
        .unwrap()
        .remove(0);
    assert_eq!((invite.expires_at - invite.created_at).num_days(), 7);
}

#[tokio::test]
async fn test_abandon_registration() {
    let app = TestApp::new().await;
    let resp = app
        .post_json("/api/v1/register/mode", json!({ "mode": "company" }))
        .await;
    let cookie = resp.cookie("reg_session").unwrap();

    let resp = app
        .send(
            Method::DELETE,
            "/api/v1/register",
            None,
            RequestContext::cookie(&cookie),
        )
        .await;
    resp.assert_status(StatusCode::NO_CONTENT);

    let resp = app
        .send(
            Method::GET,
            "/api/v1/register",
            None,
            RequestContext::cookie(&cookie),
        )
        .await;
    assert_eq!(resp.json::<Value>()["step"], "mode-select");
}

#[tokio::test]
async fn test_login() {
    let app = TestApp::new().await;
    app.register_company("owner@acme.com").await;

    let resp = app
        .post_json(
            "/api/v1/auth/login",
            json!({ "email": "OWNER@acme.com", "password": TEST_PASSWORD }),
        )
        .await;
    resp.assert_ok();
    let body: Value = resp.json();
    let token = body["access_token"].as_str().unwrap().to_string();
    assert!(body["identity"].get("password_hash").is_none());

    let resp = app
        .send(
            Method::GET,
            "/api/v1/auth/me",
            None,
            RequestContext::bearer(&token),
        )
        .await;
    resp.assert_ok();
    let body: Value = resp.json();
    assert_eq!(body["identity"]["email"], "owner@acme.com");
    assert_eq!(body["organizations"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_login_failures_are_uniform() {
    let app = TestApp::new().await;
    app.register_company("owner@acme.com").await;

    let wrong_password = app
        .post_json(
            "/api/v1/auth/login",
            json!({ "email": "owner@acme.com", "password": "not-the-password" }),
        )
        .await;
    wrong_password.assert_unauthorized();

    let unknown = app
        .post_json(
            "/api/v1/auth/login",
            json!({ "email": "nobody@acme.com", "password": "not-the-password" }),
        )
        .await;
    unknown.assert_unauthorized();

    assert_eq!(
        wrong_password.json::<Value>()["message"],
        unknown.json::<Value>()["message"]
    );
}

#[tokio::test]
async fn test_me_requires_token() {
    let app = TestApp::new().await;
    app.get("/api/v1/auth/me").await.assert_unauthorized();
}

#[tokio::test]
async fn test_invite_lifecycle_over_http() {
    let app = TestApp::new().await;
    let reg = app.register_company("owner@acme.com").await;
    let token = app.token_for(&reg.identity);
    let owner = RequestContext::bearer(&token).tenant(reg.organization.id);

    let resp = app
        .send(
            Method::POST,
            "/api/v1/invites",
            Some(json!({ "email": "bob@x.com", "role": "manager", "days_valid": 3 })),
            owner,
        )
        .await;
    resp.assert_created();
    let body: Value = resp.json();
    assert!(body["invitation_url"]
        .as_str()
        .unwrap()
        .contains("/accept-invite?token="));
    assert_eq!(body["invite"]["status"], "pending");
    assert!(body["invite"].get("token").is_none());

    let invite_token = app.notifier.last_token().unwrap();

    let resp = app
        .get(&format!(
            "/api/v1/invites/accept?token={}",
            urlencoding::encode(&invite_token)
        ))
        .await;
    resp.assert_ok();
    let preview: Value = resp.json();
    assert_eq!(preview["email"], "bob@x.com");
    assert_eq!(preview["role"], "manager");
    assert_eq!(preview["account_exists"], false);

    let resp = app
        .post_json("/api/v1/invites/accept", json!({ "token": invite_token }))
        .await;
    resp.assert_ok();
    assert_eq!(resp.json::<Value>()["status"], "profile_required");

    let resp = app
        .post_json(
            "/api/v1/invites/accept",
            json!({
                "token": invite_token,
                "profile": {
                    "first_name": "Bob",
                    "last_name": "Lee",
                    "password": TEST_PASSWORD,
                },
            }),
        )
        .await;
    resp.assert_created();
    let body: Value = resp.json();
    assert_eq!(body["status"], "registered");
    assert_eq!(body["membership"]["role"], "manager");
    assert!(body["auth"]["access_token"].as_str().is_some());

    // A second redemption conflicts
    let resp = app
        .post_json(
            "/api/v1/invites/accept",
            json!({
                "token": invite_token,
                "profile": {
                    "first_name": "Bob",
                    "last_name": "Lee",
                    "password": TEST_PASSWORD,
                },
            }),
        )
        .await;
    resp.assert_status(StatusCode::CONFLICT);

    let resp = app
        .send(Method::GET, "/api/v1/invites/history", None, owner)
        .await;
    resp.assert_ok();
    assert_eq!(resp.json::<Vec<Value>>().len(), 1);
}

#[tokio::test]
async fn test_signed_in_invitee_accepts() {
    let app = TestApp::new().await;
    let acme = app.register_company("owner@acme.com").await;
    let other = app.register_company("carol@other.com").await;

    let issued = app
        .state
        .team()
        .invite_member(
            acme.identity.id,
            acme.organization.id,
            "carol@other.com".to_string(),
            Some("admin".to_string()),
            None,
        )
        .await
        .unwrap();

    // Anonymous callers are sent to sign in
    let resp = app
        .post_json(
            "/api/v1/invites/accept",
            json!({ "token": issued.invite.token }),
        )
        .await;
    resp.assert_ok();
    assert_eq!(resp.json::<Value>()["status"], "requires_login");

    let token = app.token_for(&other.identity);
    let resp = app
        .send(
            Method::POST,
            "/api/v1/invites/accept",
            Some(json!({ "token": issued.invite.token })),
            RequestContext::bearer(&token),
        )
        .await;
    resp.assert_ok();
    let body: Value = resp.json();
    assert_eq!(body["status"], "accepted");
    assert_eq!(body["membership"]["role"], "admin");

    let resp = app
        .send(
            Method::GET,
            "/api/v1/organizations",
            None,
            RequestContext::bearer(&token),
        )
        .await;
    resp.assert_ok();
    assert_eq!(resp.json::<Vec<Value>>().len(), 2);
}

#[tokio::test]
async fn test_expired_or_unknown_token() {
    let app = TestApp::new().await;
    app.get("/api/v1/invites/accept?token=does-not-exist")
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let reg = app.register_company("owner@acme.com").await;
    let issued = app
        .state
        .team()
        .invite_member(
            reg.identity.id,
            reg.organization.id,
            "bob@x.com".to_string(),
            None,
            None,
        )
        .await
        .unwrap();
    app.state.invites().revoke(issued.invite.id).await.unwrap();

    app.get(&format!(
        "/api/v1/invites/accept?token={}",
        urlencoding::encode(&issued.invite.token)
    ))
    .await
    .assert_status(StatusCode::GONE);
}

#[tokio::test]
async fn test_foreign_tenant_is_forbidden() {
    let app = TestApp::new().await;
    let acme = app.register_company("owner@acme.com").await;
    let other = app.register_company("owner@other.com").await;
    let token = app.token_for(&other.identity);

    let resp = app
        .send(
            Method::GET,
            "/api/v1/organizations/current",
            None,
            RequestContext::bearer(&token).tenant(acme.organization.id),
        )
        .await;
    resp.assert_forbidden();
    assert!(!resp.text().contains(&acme.organization.legal_name));

    let resp = app
        .send(
            Method::POST,
            "/api/v1/invites",
            Some(json!({ "email": "bob@x.com" })),
            RequestContext::bearer(&token).tenant(acme.organization.id),
        )
        .await;
    resp.assert_forbidden();
    assert_eq!(app.count("invites").await, 0);
}

#[tokio::test]
async fn test_viewer_cannot_invite_over_http() {
    let app = TestApp::new().await;
    let reg = app.register_company("owner@acme.com").await;
    let (viewer, _) = app
        .add_member(reg.organization.id, "viewer@acme.com", Role::Viewer)
        .await;
    let token = app.token_for(&viewer);

    let resp = app
        .send(
            Method::POST,
            "/api/v1/invites",
            Some(json!({ "email": "bob@x.com", "role": "admin" })),
            RequestContext::bearer(&token).tenant(reg.organization.id),
        )
        .await;
    resp.assert_forbidden();
    assert_eq!(app.count("invites").await, 0);

    // Viewers can still read their organization
    let resp = app
        .send(
            Method::GET,
            "/api/v1/organizations/current/team",
            None,
            RequestContext::bearer(&token).tenant(reg.organization.id),
        )
        .await;
    resp.assert_ok();
}

#[tokio::test]
async fn test_current_organization_defaults_to_first_membership() {
    let app = TestApp::new().await;
    let reg = app.register_company("owner@acme.com").await;
    let token = app.token_for(&reg.identity);

    let resp = app
        .send(
            Method::GET,
            "/api/v1/organizations/current",
            None,
            RequestContext::bearer(&token),
        )
        .await;
    resp.assert_ok();
    let body: Value = resp.json();
    assert_eq!(body["organization"]["id"], reg.organization.id.to_string());
    assert_eq!(body["role"], "owner");
}

#[tokio::test]
async fn test_deactivate_member_over_http() {
    let app = TestApp::new().await;
    let reg = app.register_company("owner@acme.com").await;
    let (member, membership) = app
        .add_member(reg.organization.id, "op@acme.com", Role::Operator)
        .await;
    let owner_token = app.token_for(&reg.identity);

    let resp = app
        .send(
            Method::POST,
            &format!(
                "/api/v1/organizations/current/members/{}/deactivate",
                membership.id
            ),
            None,
            RequestContext::bearer(&owner_token).tenant(reg.organization.id),
        )
        .await;
    resp.assert_ok();
    assert_eq!(resp.json::<Value>()["is_active"], false);

    let member_token = app.token_for(&member);
    app.send(
        Method::GET,
        "/api/v1/organizations/current",
        None,
        RequestContext::bearer(&member_token).tenant(reg.organization.id),
    )
    .await
    .assert_forbidden();
}
