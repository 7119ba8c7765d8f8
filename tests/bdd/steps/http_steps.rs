use std::sync::Arc;

use cucumber::gherkin::Step;
use cucumber::{given, then, when};
use reqwest::Method;
use reqwest::multipart::Form;
use serde_json::Value;

use crate::HrWorld;

/// Secret the in-process server signs session tokens with.
pub const TEST_JWT_SECRET: &str = "bdd-test-secret";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Start an in-process API server using the world's temp database and a
/// local media store. Binds to a random free port (port 0), stores the port
/// and task handle in the world for later use and cleanup.
pub async fn start_test_server(world: &mut HrWorld) -> u16 {
    let db_path = world
        .db_path
        .as_ref()
        .expect("db_path not set, did you forget 'Given an hrdesk database is initialized'?")
        .clone();
    let upload_dir = world.upload_dir.clone().expect("upload_dir not set");

    let db = hrdesk::db::Database::open(&db_path).expect("failed to open database for web server");
    db.migrate().expect("failed to migrate database");
    let tokens = hrdesk::auth::TokenKeys::new(TEST_JWT_SECRET, chrono::Duration::days(30));
    let media = Arc::new(hrdesk::media::LocalStore::new(upload_dir.clone()));
    let state = hrdesk::web::AppState::new(db, tokens, media);
    let app = hrdesk::web::create_router(state, Some(&upload_dir));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind to ephemeral port");
    let port = listener
        .local_addr()
        .expect("failed to get local addr")
        .port();

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("web server error in test");
    });

    world.server_port = Some(port);
    world.server_handle = Some(handle);

    // Poll until the server accepts connections, up to 20 tries.
    for _ in 0..20 {
        if world
            .http_client
            .get(format!("http://127.0.0.1:{port}/"))
            .send()
            .await
            .is_ok()
        {
            break;
        }
        tokio::time::sleep(tokio::time::Duration::from_millis(5)).await;
    }

    port
}

/// Body of an outgoing request.
pub enum Payload {
    Empty,
    Json(Value),
    Multipart(Form),
}

/// Send a request to the test server, with the current session token if any.
/// Stores the status code and body on the world.
pub async fn send(
    world: &mut HrWorld,
    method: Method,
    path: &str,
    payload: Payload,
    auth: Option<String>,
) -> (u16, String) {
    let port = world
        .server_port
        .expect("server not started, add 'Given the API server is running'");
    let url = format!("http://127.0.0.1:{port}{}", world.resolve(path));
    let mut req = world.http_client.request(method.clone(), &url);
    if let Some(auth) = auth.or_else(|| world.session.as_ref().map(|t| format!("Bearer {t}"))) {
        req = req.header(reqwest::header::AUTHORIZATION, auth);
    }
    req = match payload {
        Payload::Empty => req,
        Payload::Json(body) => req.json(&body),
        Payload::Multipart(form) => req.multipart(form),
    };
    let resp = req
        .send()
        .await
        .unwrap_or_else(|e| panic!("{method} {url} failed: {e}"));
    let status = resp.status().as_u16();
    let body = resp
        .text()
        .await
        .unwrap_or_else(|e| panic!("failed to read response body: {e}"));
    world.last_response_status = Some(status);
    world.last_response_body = Some(body.clone());
    (status, body)
}

pub async fn http_get(world: &mut HrWorld, path: &str) -> (u16, String) {
    send(world, Method::GET, path, Payload::Empty, None).await
}

pub async fn http_post(world: &mut HrWorld, path: &str, body: Value) -> (u16, String) {
    send(world, Method::POST, path, Payload::Json(body), None).await
}

pub async fn http_put(world: &mut HrWorld, path: &str, body: Value) -> (u16, String) {
    send(world, Method::PUT, path, Payload::Json(body), None).await
}

pub async fn http_delete(world: &mut HrWorld, path: &str) -> (u16, String) {
    send(world, Method::DELETE, path, Payload::Empty, None).await
}

/// Parse the last response body as JSON, panicking with a descriptive message
/// if it is not valid JSON.
pub fn parse_last_response(world: &HrWorld) -> Value {
    let body = world
        .last_response_body
        .as_deref()
        .expect("no HTTP response body recorded");
    serde_json::from_str(body)
        .unwrap_or_else(|e| panic!("response body is not valid JSON: {e}\nbody: {body}"))
}

/// Follow a dotted path such as `task.members.0.firstName`.
pub fn lookup(json: &Value, path: &str) -> Value {
    let mut cur = json;
    for key in path.split('.') {
        let next = match cur {
            Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            Value::Object(map) => map.get(key),
            _ => None,
        };
        match next {
            Some(v) => cur = v,
            None => return Value::Null,
        }
    }
    cur.clone()
}

/// Compare a JSON value with the textual form used in feature files.
/// Numbers compare numerically so `280` matches `280.0`.
pub fn assert_value_matches(actual: &Value, expected: &str, path: &str) {
    let matches = match actual {
        Value::String(s) => s == expected,
        Value::Number(n) => match (n.as_f64(), expected.parse::<f64>()) {
            (Some(a), Ok(e)) => (a - e).abs() < 1e-9,
            _ => false,
        },
        Value::Bool(b) => b.to_string() == expected,
        Value::Null => expected == "null",
        other => other.to_string() == expected,
    };
    assert!(
        matches,
        "expected field {path:?} to be {expected:?} but it was {actual}"
    );
}

fn docstring_json(world: &HrWorld, step: &Step) -> Value {
    let raw = step.docstring.as_deref().expect("step needs a JSON docstring");
    let resolved = world.resolve(raw.trim());
    serde_json::from_str(&resolved)
        .unwrap_or_else(|e| panic!("docstring is not valid JSON: {e}\n{resolved}"))
}

// ---------------------------------------------------------------------------
// Given steps
// ---------------------------------------------------------------------------

/// Start the in-process API server backed by the world's temp database.
#[given("the API server is running")]
async fn the_api_server_is_running(world: &mut HrWorld) {
    start_test_server(world).await;
}

// ---------------------------------------------------------------------------
// When steps
// ---------------------------------------------------------------------------

#[when(expr = "I GET {string}")]
async fn i_get_path(world: &mut HrWorld, path: String) {
    http_get(world, &path).await;
}

#[when(expr = "I GET {string} without a token")]
async fn i_get_path_without_a_token(world: &mut HrWorld, path: String) {
    world.session = None;
    http_get(world, &path).await;
}

/// Send a raw `Authorization` header value.
#[when(expr = "I GET {string} with authorization {string}")]
async fn i_get_path_with_authorization(world: &mut HrWorld, path: String, auth: String) {
    send(world, Method::GET, &path, Payload::Empty, Some(auth)).await;
}

#[when(expr = "I POST {string} with:")]
async fn i_post_with(world: &mut HrWorld, step: &Step, path: String) {
    let body = docstring_json(world, step);
    http_post(world, &path, body).await;
}

#[when(expr = "I PUT {string} with:")]
async fn i_put_with(world: &mut HrWorld, step: &Step, path: String) {
    let body = docstring_json(world, step);
    http_put(world, &path, body).await;
}

/// A JSON object padded past the server's request body ceiling.
#[when(expr = "I POST {string} with a JSON body over the size limit")]
async fn i_post_an_oversized_body(world: &mut HrWorld, path: String) {
    let body = serde_json::json!({
        "title": "Too big",
        "dueDate": "2025-03-01",
        "description": "x".repeat(hrdesk::config::MAX_BODY_BYTES),
    });
    http_post(world, &path, body).await;
}

#[when(expr = "I DELETE {string}")]
async fn i_delete_path(world: &mut HrWorld, path: String) {
    http_delete(world, &path).await;
}

/// Download a file whose URL is in a field of the last response.
#[when(expr = "I download the file at response field {string}")]
async fn i_download_the_file_at(world: &mut HrWorld, field: String) {
    let json = parse_last_response(world);
    let url = lookup(&json, &field);
    let url = url
        .as_str()
        .unwrap_or_else(|| panic!("field {field:?} is not a string: {url}"))
        .to_string();
    http_get(world, &url).await;
}

/// Store an id from the last response under an alias for later `<alias>` use.
#[when(expr = "I remember the response field {string} as {string}")]
async fn i_remember_the_response_field(world: &mut HrWorld, path: String, alias: String) {
    let json = parse_last_response(world);
    let value = lookup(&json, &path);
    let id = value
        .as_str()
        .unwrap_or_else(|| panic!("field {path:?} is not a string: {value}"))
        .to_string();
    world.record_ids.insert(alias, id);
}

// ---------------------------------------------------------------------------
// Then steps
// ---------------------------------------------------------------------------

/// Assert that the most recent HTTP response had the given status code.
#[then(expr = "the response status is {int}")]
async fn the_response_status_is(world: &mut HrWorld, expected: u16) {
    let actual = world
        .last_response_status
        .expect("no HTTP response recorded, did you make a request?");
    assert_eq!(
        actual,
        expected,
        "expected HTTP status {expected} but got {actual}: {}",
        world.last_response_body.as_deref().unwrap_or_default()
    );
}

#[then(expr = "the response body contains {string}")]
async fn the_response_body_contains(world: &mut HrWorld, expected: String) {
    let body = world
        .last_response_body
        .as_deref()
        .expect("no HTTP response body recorded, did you make a request?");
    assert!(
        body.contains(&expected),
        "expected response body to contain {expected:?}, but body was:\n{body}"
    );
}

#[then(expr = "the response body is {string}")]
async fn the_response_body_is(world: &mut HrWorld, expected: String) {
    let body = world
        .last_response_body
        .as_deref()
        .expect("no HTTP response body recorded");
    assert_eq!(body, expected);
}

#[then(expr = "the response message is {string}")]
async fn the_response_message_is(world: &mut HrWorld, expected: String) {
    let json = parse_last_response(world);
    assert_value_matches(&lookup(&json, "message"), &expected, "message");
}

#[then(expr = "the response field {string} is {string}")]
async fn the_response_field_is(world: &mut HrWorld, path: String, expected: String) {
    let json = parse_last_response(world);
    let expected = world.resolve(&expected);
    assert_value_matches(&lookup(&json, &path), &expected, &path);
}

#[then(expr = "the response field {string} starts with {string}")]
async fn the_response_field_starts_with(world: &mut HrWorld, path: String, prefix: String) {
    let json = parse_last_response(world);
    let value = lookup(&json, &path);
    assert!(
        value.as_str().is_some_and(|s| s.starts_with(&prefix)),
        "expected field {path:?} to start with {prefix:?} but it was {value}"
    );
}

#[then(expr = "the response field {string} has {int} item(s)")]
async fn the_response_field_has_items(world: &mut HrWorld, path: String, expected: usize) {
    let json = parse_last_response(world);
    let value = lookup(&json, &path);
    let len = value
        .as_array()
        .unwrap_or_else(|| panic!("field {path:?} is not an array: {value}"))
        .len();
    assert_eq!(len, expected, "unexpected length of {path:?}: {value}");
}

#[then(expr = "the response field {string} is absent")]
async fn the_response_field_is_absent(world: &mut HrWorld, path: String) {
    let json = parse_last_response(world);
    let value = lookup(&json, &path);
    assert!(value.is_null(), "expected {path:?} to be absent, got {value}");
}

/// Assert the titles of an array of records, in order.
#[then(expr = "the response titles under {string} are {string}")]
async fn the_response_titles_are(world: &mut HrWorld, path: String, expected: String) {
    let json = parse_last_response(world);
    let value = lookup(&json, &path);
    let titles: Vec<&str> = value
        .as_array()
        .unwrap_or_else(|| panic!("field {path:?} is not an array: {value}"))
        .iter()
        .map(|item| item["title"].as_str().unwrap_or_default())
        .collect();
    let expected: Vec<&str> = if expected.is_empty() {
        Vec::new()
    } else {
        expected.split(',').map(str::trim).collect()
    };
    assert_eq!(titles, expected);
}

#[then(expr = "the upload folder {string} holds {int} file(s)")]
async fn the_upload_folder_holds(world: &mut HrWorld, folder: String, expected: usize) {
    let dir = world
        .upload_dir
        .as_ref()
        .expect("upload_dir not set")
        .join(&folder);
    let count = match std::fs::read_dir(&dir) {
        Ok(entries) => entries.filter_map(Result::ok).count(),
        Err(_) => 0,
    };
    assert_eq!(count, expected, "unexpected file count in {}", dir.display());
}
