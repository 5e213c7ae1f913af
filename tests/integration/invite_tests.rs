//! Invite engine tests: issuance policy, redemption and its races

use chrono::{Duration, Utc};
use uuid::Uuid;

use appzero_accounts::models::{
    CompanyRegistration, InviteStatus, IssueInvite, Redemption, Role,
};
use appzero_accounts::services::DomainError;

use crate::common::*;

fn issue(reg: &CompanyRegistration, email: &str, role: Option<&str>) -> IssueInvite {
    IssueInvite {
        organization_id: reg.organization.id,
        email: email.to_string(),
        role: role.map(str::to_string),
        days_valid: Some("7".to_string()),
        invited_by: Some(reg.identity.id),
    }
}

/// Push an invite's expiry into the past
async fn expire(app: &TestApp, invite_id: Uuid) {
    let past = appzero_accounts::db::format_timestamp(Utc::now() - Duration::minutes(1));
    sqlx::query("UPDATE invites SET expires_at = ? WHERE id = ?")
        .bind(past)
        .bind(invite_id.to_string())
        .execute(&app.state.db)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_new_invitee_completes_redemption() {
    let app = TestApp::new().await;
    let reg = app.register_company("owner@acme.com").await;
    let engine = app.state.invites();

    let invite = engine
        .issue(issue(&reg, "bob@x.com", Some("manager")))
        .await
        .unwrap();
    assert_eq!(invite.role, Role::Manager);
    assert_eq!(invite.status(), InviteStatus::Pending);
    let days = (invite.expires_at - invite.created_at).num_days();
    assert_eq!(days, 7);

    match engine.redeem(&invite.token, None).await.unwrap() {
        Redemption::ProfileRequired(summary) => {
            assert_eq!(summary.email, "bob@x.com");
            assert_eq!(summary.organization_id, reg.organization.id);
        }
        other => panic!("expected ProfileRequired, got {:?}", other),
    }

    let accepted = engine
        .complete_redemption(&invite.token, invite_profile("Bob", "Lee"))
        .await
        .unwrap();

    assert_eq!(accepted.identity.email, "bob@x.com");
    assert_eq!(accepted.membership.role, Role::Manager);
    assert!(accepted.membership.is_active);
    assert_eq!(accepted.membership.organization_id, reg.organization.id);
    assert!(accepted.invite.accepted_at.is_some());
    assert_eq!(accepted.invite.status(), InviteStatus::Accepted);

    // The new identity can sign in with the chosen password
    app.state
        .identities()
        .verify_credentials("bob@x.com", TEST_PASSWORD)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_role_outside_closed_set_falls_back_to_viewer() {
    let app = TestApp::new().await;
    let reg = app.register_company("owner@acme.com").await;

    let invite = app
        .state
        .invites()
        .issue(issue(&reg, "eve@x.com", Some("superadmin")))
        .await
        .unwrap();
    assert_eq!(invite.role, Role::Viewer);
}

#[tokio::test]
async fn test_unusable_validity_uses_default() {
    let app = TestApp::new().await;
    let reg = app.register_company("owner@acme.com").await;
    let engine = app.state.invites();

    for raw in [
        None,
        Some("abc"),
        Some("0"),
        Some("-3"),
        Some("366"),
        Some("3000000"),
        Some("100000000"),
        Some("9223372036854775807"),
    ] {
        let mut request = issue(&reg, &unique_email("ttl"), None);
        request.days_valid = raw.map(str::to_string);
        let invite = engine.issue(request).await.unwrap();
        assert_eq!(
            (invite.expires_at - invite.created_at).num_days(),
            7,
            "days_valid {:?}",
            raw
        );
    }
}

#[tokio::test]
async fn test_longest_validity_stays_redeemable() {
    let app = TestApp::new().await;
    let reg = app.register_company("owner@acme.com").await;
    let engine = app.state.invites();

    let mut request = issue(&reg, "long@x.com", Some("manager"));
    request.days_valid = Some("365".to_string());
    let invite = engine.issue(request).await.unwrap();
    assert_eq!((invite.expires_at - invite.created_at).num_days(), 365);

    let stored = engine.validate_pending(&invite.token).await.unwrap();
    assert_eq!(stored.id, invite.id);
    assert_eq!(stored.status(), InviteStatus::Pending);
    let pending = engine.list_pending(reg.organization.id).await.unwrap();
    assert!(pending.iter().any(|i| i.id == invite.id));

    let accepted = engine
        .complete_redemption(&invite.token, invite_profile("Long", "Lived"))
        .await
        .unwrap();
    assert_eq!(accepted.invite.status(), InviteStatus::Accepted);
}

#[tokio::test]
async fn test_unrepresentable_expiry_is_rejected() {
    let mut config = test_config();
    config.invites.max_days_valid = i64::MAX;
    let app = TestApp::with_config(config).await;
    let reg = app.register_company("owner@acme.com").await;

    for raw in ["100000000", "9223372036854775807"] {
        let mut request = issue(&reg, &unique_email("far"), None);
        request.days_valid = Some(raw.to_string());
        let result = app.state.invites().issue(request).await;
        assert!(
            matches!(result, Err(DomainError::Validation(_))),
            "days_valid {}",
            raw
        );
    }
    assert_eq!(app.count("invites").await, 0);
}

#[tokio::test]
async fn test_corrupt_stored_invite_is_internal_error() {
    let app = TestApp::new().await;
    let reg = app.register_company("owner@acme.com").await;
    let engine = app.state.invites();

    let invite = engine
        .issue(issue(&reg, "bob@x.com", None))
        .await
        .unwrap();
    sqlx::query("UPDATE invites SET expires_at = ? WHERE id = ?")
        .bind("+10240-07-07T04:23:19.748999Z")
        .bind(invite.id.to_string())
        .execute(&app.state.db)
        .await
        .unwrap();

    assert!(matches!(
        engine.get(invite.id).await,
        Err(DomainError::Internal(_))
    ));
    assert!(matches!(
        engine.validate_pending(&invite.token).await,
        Err(DomainError::Internal(_))
    ));
}

#[tokio::test]
async fn test_issue_rejects_bad_email_and_unknown_organization() {
    let app = TestApp::new().await;
    let reg = app.register_company("owner@acme.com").await;
    let engine = app.state.invites();

    let bad_email = engine.issue(issue(&reg, "not-an-email", None)).await;
    assert!(matches!(bad_email, Err(DomainError::Validation(_))));

    let mut request = issue(&reg, "bob@x.com", None);
    request.organization_id = Uuid::new_v4();
    let unknown_org = engine.issue(request).await;
    assert!(matches!(unknown_org, Err(DomainError::OrganizationNotFound)));

    assert_eq!(app.count("invites").await, 0);
}

#[tokio::test]
async fn test_existing_identity_redeems_for_itself() {
    let app = TestApp::new().await;
    let reg = app.register_company("owner@acme.com").await;
    let other = app.register_company("carol@x.com").await;
    let engine = app.state.invites();

    let invite = engine
        .issue(issue(&reg, "Carol@X.com", Some("operator")))
        .await
        .unwrap();
    assert_eq!(invite.email, "carol@x.com");

    match engine.redeem(&invite.token, None).await.unwrap() {
        Redemption::RequiresLogin { email } => assert_eq!(email, "carol@x.com"),
        other => panic!("expected RequiresLogin, got {:?}", other),
    }

    match engine
        .redeem(&invite.token, Some(&other.identity))
        .await
        .unwrap()
    {
        Redemption::Accepted { invite, membership } => {
            assert!(invite.accepted_at.is_some());
            assert_eq!(membership.role, Role::Operator);
            assert_eq!(membership.organization_id, reg.organization.id);
            assert_eq!(membership.identity_id, other.identity.id);
        }
        other => panic!("expected Accepted, got {:?}", other),
    }

    let orgs = app
        .state
        .organizations()
        .list_for_identity(other.identity.id)
        .await
        .unwrap();
    assert_eq!(orgs.len(), 2);
}

#[tokio::test]
async fn test_redeem_rejects_other_identity() {
    let app = TestApp::new().await;
    let reg = app.register_company("owner@acme.com").await;
    let mallory = app.create_identity("mallory@x.com").await;
    let engine = app.state.invites();

    let invite = engine
        .issue(issue(&reg, "bob@x.com", None))
        .await
        .unwrap();
    let result = engine.redeem(&invite.token, Some(&mallory)).await;

    assert!(matches!(result, Err(DomainError::EmailMismatch)));
    let stored = engine.get(invite.id).await.unwrap().unwrap();
    assert!(stored.accepted_at.is_none());
}

#[tokio::test]
async fn test_concurrent_redemption_succeeds_once() {
    let app = TestApp::new().await;
    let reg = app.register_company("owner@acme.com").await;
    let engine = app.state.invites();

    let invite = engine
        .issue(issue(&reg, "race@x.com", Some("admin")))
        .await
        .unwrap();

    let first = app.state.invites();
    let second = app.state.invites();
    let (a, b) = tokio::join!(
        first.complete_redemption(&invite.token, invite_profile("Race", "One")),
        second.complete_redemption(&invite.token, invite_profile("Race", "Two")),
    );

    let outcomes = [a, b];
    let wins = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1);
    assert!(outcomes
        .iter()
        .any(|r| matches!(r, Err(DomainError::InviteAlreadyAccepted))));

    // owner + one invitee
    assert_eq!(app.count("identities").await, 2);
    assert_eq!(app.count("memberships").await, 2);
}

#[tokio::test]
async fn test_second_redemption_is_rejected() {
    let app = TestApp::new().await;
    let reg = app.register_company("owner@acme.com").await;
    let engine = app.state.invites();
    let invite = engine
        .issue(issue(&reg, "bob@x.com", None))
        .await
        .unwrap();

    engine
        .complete_redemption(&invite.token, invite_profile("Bob", "Lee"))
        .await
        .unwrap();
    let again = engine
        .complete_redemption(&invite.token, invite_profile("Bob", "Lee"))
        .await;

    assert!(matches!(again, Err(DomainError::InviteAlreadyAccepted)));
}

#[tokio::test]
async fn test_expired_invite_cannot_be_redeemed() {
    let app = TestApp::new().await;
    let reg = app.register_company("owner@acme.com").await;
    let engine = app.state.invites();
    let invite = engine
        .issue(issue(&reg, "late@x.com", None))
        .await
        .unwrap();
    expire(&app, invite.id).await;

    let result = engine
        .complete_redemption(&invite.token, invite_profile("Late", "Comer"))
        .await;
    assert!(matches!(result, Err(DomainError::InviteExpired)));
    assert_eq!(app.count("identities").await, 1);

    let stored = engine.get(invite.id).await.unwrap().unwrap();
    assert_eq!(stored.status(), InviteStatus::Expired);
    assert!(engine.list_pending(reg.organization.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_token() {
    let app = TestApp::new().await;
    let result = app.state.invites().validate_pending("no-such-token").await;
    assert!(matches!(result, Err(DomainError::InviteNotFound)));
}

#[tokio::test]
async fn test_revoke_pending_then_redeem() {
    let app = TestApp::new().await;
    let reg = app.register_company("owner@acme.com").await;
    let engine = app.state.invites();
    let invite = engine
        .issue(issue(&reg, "bob@x.com", None))
        .await
        .unwrap();

    let revoked = engine.revoke(invite.id).await.unwrap();
    assert_eq!(revoked.status(), InviteStatus::Revoked);
    assert!(revoked.expires_at <= Utc::now());

    let result = engine
        .complete_redemption(&invite.token, invite_profile("Bob", "Lee"))
        .await;
    assert!(matches!(result, Err(DomainError::InviteExpired)));
}

#[tokio::test]
async fn test_accepted_invite_cannot_be_revoked() {
    let app = TestApp::new().await;
    let reg = app.register_company("owner@acme.com").await;
    let engine = app.state.invites();
    let invite = engine
        .issue(issue(&reg, "bob@x.com", None))
        .await
        .unwrap();
    engine
        .complete_redemption(&invite.token, invite_profile("Bob", "Lee"))
        .await
        .unwrap();

    let result = engine.revoke(invite.id).await;
    assert!(matches!(result, Err(DomainError::AlreadyAccepted)));
    let stored = engine.get(invite.id).await.unwrap().unwrap();
    assert_eq!(stored.status(), InviteStatus::Accepted);
}

#[tokio::test]
async fn test_pending_and_history_lists() {
    let app = TestApp::new().await;
    let reg = app.register_company("owner@acme.com").await;
    let engine = app.state.invites();

    let first = engine.issue(issue(&reg, "one@x.com", None)).await.unwrap();
    let second = engine.issue(issue(&reg, "two@x.com", None)).await.unwrap();
    engine
        .complete_redemption(&first.token, invite_profile("One", "User"))
        .await
        .unwrap();

    let pending = engine.list_pending(reg.organization.id).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, second.id);

    let history = engine.list_accepted(reg.organization.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, first.id);
}

#[tokio::test]
async fn test_invitation_url_carries_token() {
    let app = TestApp::new().await;
    let url = app.state.invites().invitation_url("abc_-123");
    assert_eq!(url, "http://localhost:5080/accept-invite?token=abc_-123");
}
