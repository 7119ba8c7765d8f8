use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};

use super::errors::AppError;
use super::form::{QueryParams, Submission};
use super::session::AuthUser;
use super::{AppState, dedupe_ids, ensure_users_exist};
use crate::calendar::{self, TimeOfDay};
use crate::db::{ListFilter, MeetingChanges};
use crate::models::{
    ConversationType, Meeting, MeetingStatus, Platform, parse_day, parse_due_date,
};

const NOT_FOUND: &str = "Meeting not found or access denied";

#[derive(Debug, Default, Deserialize)]
pub struct MeetingQuery {
    status: Option<String>,
    date: Option<String>,
}

fn time_field(form: &Submission, key: &str) -> Result<Option<String>, AppError> {
    match form.non_empty(key) {
        Some(raw) => TimeOfDay::parse(&raw)
            .map(|t| Some(t.hhmm()))
            .map_err(|e| AppError::BadRequest(format!("{key}: {e}"))),
        None => Ok(None),
    }
}

fn parsed<T>(
    form: &Submission,
    key: &str,
    parse: fn(&str) -> Result<T, String>,
) -> Result<Option<T>, AppError> {
    form.non_empty(key)
        .map(|v| parse(&v).map_err(AppError::BadRequest))
        .transpose()
}

fn date_field(form: &Submission) -> Result<Option<chrono::DateTime<Utc>>, AppError> {
    match form.non_empty("dueDate") {
        Some(raw) => parse_due_date(&raw)
            .map(Some)
            .ok_or_else(|| AppError::BadRequest(format!("Invalid date: {raw}"))),
        None => Ok(None),
    }
}

fn members_field(state: &AppState, form: &Submission) -> Result<Option<Vec<String>>, AppError> {
    match form.string_list("members")? {
        Some(ids) => {
            let ids = dedupe_ids(ids);
            ensure_users_exist(state, &ids)?;
            Ok(Some(ids))
        }
        None => Ok(None),
    }
}

pub async fn schedule(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    form: Submission,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let required = ["title", "dueDate", "startTime", "endTime", "platform"];
    if required.iter().any(|k| form.non_empty(k).is_none()) {
        return Err(AppError::bad_request(
            "Title, date, time, and platform are required",
        ));
    }

    let (Some(title), Some(due_date), Some(start_time), Some(end_time), Some(platform)) = (
        form.non_empty("title"),
        date_field(&form)?,
        time_field(&form, "startTime")?,
        time_field(&form, "endTime")?,
        parsed(&form, "platform", Platform::from_str)?,
    ) else {
        return Err(AppError::bad_request(
            "Title, date, time, and platform are required",
        ));
    };

    let now = Utc::now();
    let meeting = Meeting {
        id: uuid::Uuid::new_v4().to_string(),
        title,
        organizer: user.id.clone(),
        members: members_field(&state, &form)?.unwrap_or_default(),
        due_date,
        start_time,
        end_time,
        conversation_type: parsed(&form, "conversationType", ConversationType::from_str)?
            .unwrap_or_default(),
        platform,
        meeting_link: form.text("meetingLink").unwrap_or_default(),
        description: form.text("description").unwrap_or_default(),
        status: MeetingStatus::default(),
        created_at: now,
        updated_at: now,
    };

    let db = state.db()?;
    db.insert_meeting(&meeting)?;
    tracing::info!(meeting_id = %meeting.id, user_id = %user.id, "scheduled meeting");
    let view = db.populate_meeting(meeting)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Meeting scheduled successfully",
            "meeting": view,
        })),
    ))
}

pub async fn all(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    QueryParams(query): QueryParams<MeetingQuery>,
) -> Result<Json<Value>, AppError> {
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(|s| MeetingStatus::from_str(s).map_err(AppError::BadRequest))
        .transpose()?;
    let mut filter = ListFilter {
        status,
        ..Default::default()
    };
    if let Some(raw) = query.date.as_deref().filter(|s| !s.trim().is_empty()) {
        let day = parse_day(raw).ok_or_else(|| AppError::BadRequest(format!("Invalid date: {raw}")))?;
        filter = filter.on_day(day);
    }

    let db = state.db()?;
    let meetings = db
        .list_meetings_for_user(&user.id, &filter)?
        .into_iter()
        .map(|m| db.populate_meeting(m))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(json!({ "success": true, "meetings": meetings })))
}

/// The caller's meetings laid out on the week grid containing `?date=`.
pub async fn week(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    QueryParams(query): QueryParams<MeetingQuery>,
) -> Result<Json<Value>, AppError> {
    let today = Utc::now().date_naive();
    let anchor = match query.date.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(raw) => parse_day(raw).ok_or_else(|| AppError::BadRequest(format!("Invalid date: {raw}")))?,
        None => today,
    };

    let db = state.db()?;
    let layout = calendar::week_for_user(&db, &user.id, anchor, today)?;
    Ok(Json(json!({ "success": true, "week": layout })))
}

pub async fn update(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(meeting_id): Path<String>,
    form: Submission,
) -> Result<Json<Value>, AppError> {
    let owned = state
        .db()?
        .get_meeting(&meeting_id)?
        .is_some_and(|m| m.organizer == user.id);
    if !owned {
        return Err(AppError::NotFound(NOT_FOUND.into()));
    }

    let title = form.text("title");
    if title.as_deref().is_some_and(str::is_empty) {
        return Err(AppError::bad_request("Title cannot be empty"));
    }
    let changes = MeetingChanges {
        title,
        members: members_field(&state, &form)?,
        due_date: date_field(&form)?,
        start_time: time_field(&form, "startTime")?,
        end_time: time_field(&form, "endTime")?,
        conversation_type: parsed(&form, "conversationType", ConversationType::from_str)?,
        platform: parsed(&form, "platform", Platform::from_str)?,
        meeting_link: form.text("meetingLink"),
        description: form.text("description"),
        status: parsed(&form, "status", MeetingStatus::from_str)?,
    };

    let db = state.db()?;
    if !db.update_meeting(&meeting_id, &changes)? {
        return Err(AppError::NotFound(NOT_FOUND.into()));
    }
    let meeting = db
        .get_meeting(&meeting_id)?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.into()))?;
    let view = db.populate_meeting(meeting)?;

    Ok(Json(json!({
        "success": true,
        "message": "Meeting updated successfully",
        "meeting": view,
    })))
}

pub async fn remove(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(meeting_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let db = state.db()?;
    let owned = db
        .get_meeting(&meeting_id)?
        .is_some_and(|m| m.organizer == user.id);
    if !owned || !db.delete_meeting(&meeting_id)? {
        return Err(AppError::NotFound(NOT_FOUND.into()));
    }
    tracing::info!(%meeting_id, "deleted meeting");

    Ok(Json(json!({ "success": true, "message": "Meeting deleted successfully" })))
}
