use cucumber::{given, when};
use reqwest::Method;
use reqwest::multipart::{Form, Part};
use serde_json::{Value, json};

use crate::HrWorld;
use crate::steps::http_steps::{Payload, http_post, parse_last_response, send};

/// Member aliases such as `"Bob, Cy"` resolved to user ids.
pub fn member_ids(world: &HrWorld, aliases: &str) -> Vec<String> {
    aliases
        .split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(|a| world.resolve(&format!("<{a}>")))
        .collect()
}

/// Create a task as `owner` via the JSON API and remember it under `alias`.
async fn api_create_task(world: &mut HrWorld, owner: &str, alias: &str, body: Value) {
    let token = world.token_for(owner);
    let saved = world.session.replace(token);
    let (status, body_text) = http_post(world, "/api/task/create", body).await;
    world.session = saved;
    assert_eq!(
        status, 201,
        "expected 201 from POST /api/task/create but got {status}: {body_text}"
    );
    let json = parse_last_response(world);
    let id = json["task"]["_id"]
        .as_str()
        .unwrap_or_else(|| panic!("create response has no task id: {json}"))
        .to_string();
    world.record_ids.insert(alias.to_string(), id);
}

/// A multipart task form with `count` small text attachments. Lists are
/// JSON-encoded strings, the way the browser client sends them.
fn task_form(fields: &[(&str, String)], count: usize) -> Form {
    let mut form = Form::new();
    for (name, value) in fields {
        form = form.text(name.to_string(), value.clone());
    }
    for i in 1..=count {
        let part = Part::bytes(format!("file {i} contents").into_bytes())
            .file_name(format!("notes {i}.txt"))
            .mime_str("text/plain")
            .expect("mime");
        form = form.part("files", part);
    }
    form
}

// ---------------------------------------------------------------------------
// Given steps
// ---------------------------------------------------------------------------

#[given(expr = "{string} created a task {string} due {string} as {string}")]
async fn created_a_task(world: &mut HrWorld, owner: String, title: String, due: String, alias: String) {
    api_create_task(world, &owner, &alias, json!({ "title": title, "dueDate": due })).await;
}

#[given(expr = "{string} created a task {string} due {string} with members {string} as {string}")]
async fn created_a_task_with_members(
    world: &mut HrWorld,
    owner: String,
    title: String,
    due: String,
    members: String,
    alias: String,
) {
    let members = member_ids(world, &members);
    api_create_task(
        world,
        &owner,
        &alias,
        json!({ "title": title, "dueDate": due, "members": members }),
    )
    .await;
}

// ---------------------------------------------------------------------------
// When steps
// ---------------------------------------------------------------------------

/// Submit the create form as multipart with attachments.
#[when(expr = "I create a task {string} due {string} with {int} attached file(s)")]
async fn i_create_a_task_with_files(world: &mut HrWorld, title: String, due: String, count: usize) {
    let form = task_form(
        &[
            ("title", title),
            ("dueDate", due),
            ("priority", "urgent".to_string()),
            ("members", "[]".to_string()),
            ("labels", r#"["hiring"," ops "]"#.to_string()),
        ],
        count,
    );
    send(
        world,
        Method::POST,
        "/api/task/create",
        Payload::Multipart(form),
        None,
    )
    .await;
}

#[when(expr = "I create a task {string} with an attachment of {int} bytes")]
async fn i_create_a_task_with_large_file(world: &mut HrWorld, title: String, size: usize) {
    let part = Part::bytes(vec![b'x'; size])
        .file_name("big.bin")
        .mime_str("application/octet-stream")
        .expect("mime");
    let form = Form::new()
        .text("title", title)
        .text("dueDate", "2025-03-01")
        .part("files", part);
    send(
        world,
        Method::POST,
        "/api/task/create",
        Payload::Multipart(form),
        None,
    )
    .await;
}

#[when(expr = "I attach {int} file(s) to the task {string}")]
async fn i_attach_files_to(world: &mut HrWorld, count: usize, alias: String) {
    let form = task_form(&[("status", "in-progress".to_string())], count);
    let path = format!("/api/task/update/<{alias}>");
    send(world, Method::PUT, &path, Payload::Multipart(form), None).await;
}
