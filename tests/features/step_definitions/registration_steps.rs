//! Registration wizard step definitions

use cucumber::{given, when};

use appzero_accounts::models::{ConfirmInput, InviteTokenInput, RegistrationMode};

use crate::common::{company_step, invite_profile, user_step};
use crate::features::support::TestWorld;

#[given(expr = "{string} has entered the company {string} in the wizard")]
async fn started_company_registration(world: &mut TestWorld, email: String, company: String) {
    let wizard = world.app().await.state.wizard();
    let draft = wizard.choose_mode(RegistrationMode::Company);
    let draft = wizard.submit_user(draft, user_step(&email)).await.unwrap();
    let draft = wizard.submit_company(draft, company_step(&company)).unwrap();
    world.draft = Some(draft);
}

#[when(expr = "{string} registers the company {string}")]
async fn register_company(world: &mut TestWorld, email: String, company: String) {
    let wizard = world.app().await.state.wizard();
    let draft = wizard.choose_mode(RegistrationMode::Company);
    let draft = match wizard.submit_user(draft, user_step(&email)).await {
        Ok(draft) => draft,
        Err(e) => {
            world.record::<()>(Err(e));
            return;
        }
    };
    let draft = wizard.submit_company(draft, company_step(&company)).unwrap();
    let result = wizard
        .confirm_company(&draft, ConfirmInput { accept_terms: true })
        .await;

    if let Some(registration) = world.record(result) {
        world
            .identities
            .insert(email, registration.identity.clone());
        world.companies.insert(company, registration);
    }
}

#[when(expr = "the wizard is confirmed with terms accepted: {word}")]
async fn confirm(world: &mut TestWorld, accepted: String) {
    let draft = world.draft.clone().expect("no registration in progress");
    let result = world
        .app()
        .await
        .state
        .wizard()
        .confirm_company(&draft, ConfirmInput {
            accept_terms: accepted == "yes",
        })
        .await;
    world.record(result);
}

#[when("the registration is abandoned")]
async fn abandon(world: &mut TestWorld) {
    let wizard = world.app().await.state.wizard();
    world.draft = Some(wizard.reset());
}

#[when(expr = "someone else registers {string} first")]
async fn email_taken(world: &mut TestWorld, email: String) {
    let identity = world.app().await.create_identity(&email).await;
    world.identities.insert(email, identity);
}

#[when(expr = "the invitee registers through the wizard as {string} {string}")]
async fn register_through_invite(world: &mut TestWorld, first_name: String, last_name: String) {
    let token = world.invite_token.clone().expect("no invite issued");
    let wizard = world.app().await.state.wizard();

    let draft = wizard.choose_mode(RegistrationMode::Invite);
    let draft = match wizard
        .submit_invite_token(draft, InviteTokenInput { token })
        .await
    {
        Ok(draft) => draft,
        Err(e) => {
            world.record::<()>(Err(e));
            return;
        }
    };
    let result = wizard
        .complete_invite(&draft, invite_profile(&first_name, &last_name))
        .await;
    world.record(result);
}
