use cucumber::gherkin::Step;
use cucumber::given;
use serde_json::{Value, json};

use crate::HrWorld;
use crate::steps::http_steps::{http_post, parse_last_response};
use crate::steps::task_steps::member_ids;

/// Schedule a meeting as `organizer` and remember it under `alias`.
async fn api_schedule(world: &mut HrWorld, organizer: &str, alias: &str, body: Value) {
    let token = world.token_for(organizer);
    let saved = world.session.replace(token);
    let (status, body_text) = http_post(world, "/api/meeting/schedule", body).await;
    world.session = saved;
    assert_eq!(
        status, 201,
        "expected 201 from POST /api/meeting/schedule but got {status}: {body_text}"
    );
    let json = parse_last_response(world);
    let id = json["meeting"]["_id"]
        .as_str()
        .unwrap_or_else(|| panic!("schedule response has no meeting id: {json}"))
        .to_string();
    world.record_ids.insert(alias.to_string(), id);
}

// ---------------------------------------------------------------------------
// Given steps
// ---------------------------------------------------------------------------

/// Schedule meetings from a table with columns
/// `alias | title | date | start | end | type | members`.
#[given(expr = "{string} scheduled these meetings:")]
async fn scheduled_these_meetings(world: &mut HrWorld, step: &Step, organizer: String) {
    let table = step.table.as_ref().expect("step needs a table");
    let mut rows = table.rows.iter();
    let header = rows.next().expect("table needs a header row");
    let col = |name: &str| {
        header
            .iter()
            .position(|h| h == name)
            .unwrap_or_else(|| panic!("table has no column {name:?}"))
    };
    let (alias, title, date, start, end) = (col("alias"), col("title"), col("date"), col("start"), col("end"));
    let kind = header.iter().position(|h| h == "type");
    let members = header.iter().position(|h| h == "members");

    for row in rows {
        let mut body = json!({
            "title": row[title],
            "dueDate": row[date],
            "startTime": row[start],
            "endTime": row[end],
            "platform": "zoom",
        });
        if let Some(i) = kind {
            body["conversationType"] = json!(row[i]);
        }
        if let Some(i) = members {
            body["members"] = json!(member_ids(world, &row[i]));
        }
        api_schedule(world, &organizer, &row[alias], body).await;
    }
}
