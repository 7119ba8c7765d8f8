use cucumber::{given, then, when};
use reqwest::Method;
use reqwest::multipart::{Form, Part};
use serde_json::json;

use crate::HrWorld;
use crate::steps::http_steps::{
    Payload, TEST_JWT_SECRET, http_get, http_post, http_put, lookup, parse_last_response, send,
};

/// Password used for every user registered through the Given steps.
pub const DEFAULT_PASSWORD: &str = "secret123";

/// Register a user via the API and remember their id and token under `alias`.
async fn register_user(world: &mut HrWorld, alias: &str, email: &str) {
    let saved = world.session.take();
    let body = json!({
        "firstName": alias,
        "lastName": "Tester",
        "email": email,
        "phoneNo": "555-0100",
        "password": DEFAULT_PASSWORD,
        "confirmPassword": DEFAULT_PASSWORD,
    });
    let (status, body_text) = http_post(world, "/api/user/register", body).await;
    world.session = saved;
    assert_eq!(
        status, 201,
        "expected 201 from POST /api/user/register but got {status}: {body_text}"
    );
    let json = parse_last_response(world);
    let id = json["user"]["id"]
        .as_str()
        .unwrap_or_else(|| panic!("register response has no user id: {json}"))
        .to_string();
    let token = json["token"]
        .as_str()
        .unwrap_or_else(|| panic!("register response has no token: {json}"))
        .to_string();
    world.user_ids.insert(alias.to_string(), id);
    world.tokens.insert(alias.to_string(), token);
}

// ---------------------------------------------------------------------------
// Given steps
// ---------------------------------------------------------------------------

#[given(expr = "a registered user {string} with email {string}")]
async fn a_registered_user(world: &mut HrWorld, alias: String, email: String) {
    register_user(world, &alias, &email).await;
}

/// Register several users at once, emails derived from their names.
#[given(expr = "registered users {string}")]
async fn registered_users(world: &mut HrWorld, aliases: String) {
    for alias in aliases.split(',').map(str::trim) {
        let email = format!("{}@example.com", alias.to_lowercase());
        register_user(world, alias, &email).await;
    }
}

#[given(expr = "I am logged in as {string}")]
async fn i_am_logged_in_as(world: &mut HrWorld, alias: String) {
    world.session = Some(world.token_for(&alias));
}

// ---------------------------------------------------------------------------
// When steps
// ---------------------------------------------------------------------------

#[when(expr = "I switch to {string}")]
async fn i_switch_to(world: &mut HrWorld, alias: String) {
    world.session = Some(world.token_for(&alias));
}

#[when(expr = "I log in with email {string} and password {string}")]
async fn i_log_in_with(world: &mut HrWorld, email: String, password: String) {
    http_post(
        world,
        "/api/user/login",
        json!({ "email": email, "password": password }),
    )
    .await;
}

/// Present a validly signed token whose subject does not exist.
#[when(expr = "I GET {string} with a token for an unknown user")]
async fn i_get_with_unknown_user_token(world: &mut HrWorld, path: String) {
    let keys = hrdesk::auth::TokenKeys::new(TEST_JWT_SECRET, chrono::Duration::days(1));
    let token = keys.issue("no-such-user").expect("issue token");
    send(
        world,
        Method::GET,
        &path,
        Payload::Empty,
        Some(format!("Bearer {token}")),
    )
    .await;
}

/// Present a correctly signed token that has already expired.
#[when(expr = "I GET {string} with an expired token for {string}")]
async fn i_get_with_expired_token(world: &mut HrWorld, path: String, alias: String) {
    let id = world.resolve(&format!("<{alias}>"));
    let keys = hrdesk::auth::TokenKeys::new(TEST_JWT_SECRET, chrono::Duration::days(1));
    let now = chrono::Utc::now().timestamp();
    let claims = hrdesk::auth::Claims {
        id,
        iat: now - 7200,
        exp: now - 3600,
    };
    let token = keys.sign(&claims).expect("sign token");
    send(
        world,
        Method::GET,
        &path,
        Payload::Empty,
        Some(format!("Bearer {token}")),
    )
    .await;
}

#[when(expr = "I update my profile with a bio of {int} characters")]
async fn i_update_my_bio(world: &mut HrWorld, len: usize) {
    http_put(world, "/api/user/update", json!({ "bio": "x".repeat(len) })).await;
}

/// Upload a profile picture as multipart, the way the browser form does.
#[when(expr = "I upload the profile image {string}")]
async fn i_upload_profile_image(world: &mut HrWorld, name: String) {
    let part = Part::bytes(format!("image bytes of {name}").into_bytes())
        .file_name(name)
        .mime_str("image/png")
        .expect("mime");
    let form = Form::new()
        .text("location", "Remote")
        .part("profileImage", part);
    send(
        world,
        Method::PUT,
        "/api/user/update",
        Payload::Multipart(form),
        None,
    )
    .await;
}

// ---------------------------------------------------------------------------
// Then steps
// ---------------------------------------------------------------------------

/// The response carries a token, and that token opens a session.
#[then("the response has a working session token")]
async fn the_response_has_a_working_token(world: &mut HrWorld) {
    let json = parse_last_response(world);
    let token = lookup(&json, "token");
    let token = token
        .as_str()
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| panic!("no token in response: {json}"))
        .to_string();
    let email = lookup(&json, "user.email");

    let saved = world.session.replace(token);
    let (status, body) = http_get(world, "/api/user/data").await;
    world.session = saved;
    assert_eq!(status, 200, "token was rejected: {body}");
    let data: serde_json::Value = serde_json::from_str(&body).expect("user data JSON");
    assert_eq!(data["user"]["email"], email);
}
