//! Invitation step definitions

use chrono::{Duration, Utc};
use cucumber::{given, then, when};

use appzero_accounts::models::{InviteStatus, IssueInvite, Role};

use crate::common::invite_profile;
use crate::features::support::TestWorld;

#[given(expr = "{string} has invited {string} to {string} as {string}")]
async fn has_invited(world: &mut TestWorld, actor: String, email: String, company: String, role: String) {
    invites(world, actor, email, company, role).await;
    assert_eq!(world.last_error, None);
}

#[when(expr = "{string} invites {string} to {string} as {string}")]
async fn invites(world: &mut TestWorld, actor: String, email: String, company: String, role: String) {
    let actor_id = world.identity(&actor).id;
    let organization_id = world.company(&company).organization.id;

    let result = world
        .app()
        .await
        .state
        .team()
        .invite_member(actor_id, organization_id, email, Some(role), None)
        .await;
    if let Some(issued) = world.record(result) {
        world.invite_token = Some(issued.invite.token);
    }
}

#[given(expr = "{string} has an invite to {string} valid for {string} days")]
async fn invite_with_validity(world: &mut TestWorld, email: String, company: String, days: String) {
    let organization_id = world.company(&company).organization.id;
    let invite = world
        .app()
        .await
        .state
        .invites()
        .issue(IssueInvite {
            organization_id,
            email,
            role: None,
            days_valid: Some(days),
            invited_by: None,
        })
        .await
        .unwrap();
    world.invite_token = Some(invite.token);
}

#[given("the invite has expired")]
async fn invite_expired(world: &mut TestWorld) {
    let token = world.invite_token.clone().expect("no invite issued");
    let past = appzero_accounts::db::format_timestamp(Utc::now() - Duration::minutes(1));
    sqlx::query("UPDATE invites SET expires_at = ? WHERE token = ?")
        .bind(past)
        .bind(token)
        .execute(&world.app().await.state.db)
        .await
        .unwrap();
}

#[given("the invite has been revoked")]
async fn invite_revoked(world: &mut TestWorld) {
    let token = world.invite_token.clone().expect("no invite issued");
    let engine = world.app().await.state.invites();
    let invite = engine.find_by_token(&token).await.unwrap().unwrap();
    engine.revoke(invite.id).await.unwrap();
}

#[when(expr = "the invitee accepts the invite as a new user {string} {string}")]
async fn accept_as_new_user(world: &mut TestWorld, first_name: String, last_name: String) {
    let token = world.invite_token.clone().expect("no invite issued");
    let result = world
        .app()
        .await
        .state
        .invites()
        .complete_redemption(&token, invite_profile(&first_name, &last_name))
        .await;
    world.record(result);
}

#[when(expr = "{string} accepts the invite while signed in")]
async fn accept_signed_in(world: &mut TestWorld, email: String) {
    let token = world.invite_token.clone().expect("no invite issued");
    let identity = world.identity(&email).clone();
    let result = world
        .app()
        .await
        .state
        .invites()
        .redeem(&token, Some(&identity))
        .await;
    world.record(result);
}

#[when("two new users redeem the invite at the same time")]
async fn concurrent_redemption(world: &mut TestWorld) {
    let token = world.invite_token.clone().expect("no invite issued");
    let app = world.app().await;
    let first = app.state.invites();
    let second = app.state.invites();

    let (a, b) = tokio::join!(
        first.complete_redemption(&token, invite_profile("First", "Caller")),
        second.complete_redemption(&token, invite_profile("Second", "Caller")),
    );
    world.outcomes = [a.map(|_| ()), b.map(|_| ())]
        .into_iter()
        .map(|r| r.err().map(|e| e.code().to_string()))
        .collect();
}

#[then("exactly one redemption succeeds")]
async fn exactly_one_succeeds(world: &mut TestWorld) {
    let successes = world.outcomes.iter().filter(|o| o.is_none()).count();
    assert_eq!(successes, 1, "outcomes: {:?}", world.outcomes);
}

#[then(expr = "the other fails with {string}")]
async fn other_fails_with(world: &mut TestWorld, code: String) {
    let failures: Vec<_> = world.outcomes.iter().flatten().collect();
    assert_eq!(failures, vec![&code]);
}

#[then(expr = "the invite is {word}")]
async fn invite_status(world: &mut TestWorld, status: String) {
    let expected = match status.as_str() {
        "pending" => InviteStatus::Pending,
        "accepted" => InviteStatus::Accepted,
        "expired" => InviteStatus::Expired,
        "revoked" => InviteStatus::Revoked,
        other => panic!("Unknown invite status {}", other),
    };
    let token = world.invite_token.clone().expect("no invite issued");
    let invite = world
        .app()
        .await
        .state
        .invites()
        .find_by_token(&token)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(invite.status(), expected);
}

#[then(expr = "the invite grants the {string} role")]
async fn invite_grants_role(world: &mut TestWorld, role: String) {
    let expected: Role = role.parse().unwrap();
    let token = world.invite_token.clone().expect("no invite issued");
    let invite = world
        .app()
        .await
        .state
        .invites()
        .find_by_token(&token)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(invite.role, expected);
}

#[then(expr = "the invite is valid for {int} days")]
async fn invite_validity(world: &mut TestWorld, days: i64) {
    let token = world.invite_token.clone().expect("no invite issued");
    let invite = world
        .app()
        .await
        .state
        .invites()
        .find_by_token(&token)
        .await
        .unwrap()
        .unwrap();
    assert_eq!((invite.expires_at - invite.created_at).num_days(), days);
}
