//! Common step definitions used across features

use cucumber::{given, then};

use appzero_accounts::models::Role;

use crate::common::{company_step, user_step};
use crate::features::support::TestWorld;

#[given(expr = "a company {string} owned by {string}")]
async fn company_owned_by(world: &mut TestWorld, name: String, email: String) {
    let app = world.app().await;
    let wizard = app.state.wizard();
    let draft = wizard.choose_mode(appzero_accounts::models::RegistrationMode::Company);
    let draft = wizard.submit_user(draft, user_step(&email)).await.unwrap();
    let draft = wizard.submit_company(draft, company_step(&name)).unwrap();
    let registration = wizard
        .confirm_company(&draft, crate::common::accept_terms())
        .await
        .unwrap();

    world
        .identities
        .insert(email, registration.identity.clone());
    world.companies.insert(name, registration);
}

#[given(expr = "{string} is a(n) {string} of {string}")]
async fn is_member_of(world: &mut TestWorld, email: String, role: String, company: String) {
    let organization_id = world.company(&company).organization.id;
    let role: Role = role.parse().unwrap();
    let (identity, _) = world
        .app()
        .await
        .add_member(organization_id, &email, role)
        .await;
    world.identities.insert(email, identity);
}

#[then(expr = "{string} is an active {string} of {string}")]
async fn is_active_member(world: &mut TestWorld, email: String, role: String, company: String) {
    let organization_id = world.company(&company).organization.id;
    let role: Role = role.parse().unwrap();
    let app = world.app().await;

    let identity = app
        .state
        .identities()
        .find_by_email(&email)
        .await
        .unwrap()
        .unwrap_or_else(|| panic!("No identity for {}", email));
    let membership = app
        .state
        .memberships()
        .find(identity.id, organization_id)
        .await
        .unwrap()
        .expect("membership");

    assert!(membership.is_active);
    assert_eq!(membership.role, role);
}

#[then(expr = "the operation fails with {string}")]
async fn operation_fails_with(world: &mut TestWorld, code: String) {
    assert_eq!(world.last_error.as_deref(), Some(code.as_str()));
}

#[then("the operation succeeds")]
async fn operation_succeeds(world: &mut TestWorld) {
    assert_eq!(world.last_error, None);
}

#[then(expr = "there is/are {int} {word}")]
async fn row_count(world: &mut TestWorld, expected: i64, table: String) {
    let table = match table.as_str() {
        "organization" | "organizations" => "organizations",
        "identity" | "identities" => "identities",
        "membership" | "memberships" => "memberships",
        "invite" | "invites" => "invites",
        other => panic!("Unknown table {}", other),
    };
    assert_eq!(world.app().await.count(table).await, expected);
}

#[then(expr = "the response status should be {int}")]
async fn response_status(world: &mut TestWorld, status: u16) {
    if let Some(response) = &world.last_response {
        assert_eq!(response.status.as_u16(), status);
    } else {
        panic!("No response available");
    }
}
