use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};

use super::errors::AppError;
use super::form::{FilePart, QueryParams, Submission};
use super::session::AuthUser;
use super::{AppState, dedupe_ids, ensure_users_exist};
use crate::config::MAX_TASK_FILES;
use crate::db::{ListFilter, TaskChanges};
use crate::media::{MediaUpload, TASK_FOLDER};
use crate::models::{
    Priority, Task, TaskStatus, TaskView, UploadedFile, clean_labels, parse_day, parse_due_date,
};

const NOT_FOUND: &str = "Task not found or access denied";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQuery {
    status: Option<String>,
    due_date: Option<String>,
}

/// Push attachments to the media store in request order.
async fn upload_files(state: &AppState, files: Vec<FilePart>) -> Result<Vec<UploadedFile>, AppError> {
    if files.len() > MAX_TASK_FILES {
        return Err(AppError::BadRequest(format!(
            "At most {MAX_TASK_FILES} files can be uploaded at once"
        )));
    }
    let mut uploaded = Vec::with_capacity(files.len());
    for file in files {
        let upload = state
            .media
            .upload(MediaUpload {
                file_name: file.file_name.clone(),
                folder: TASK_FOLDER,
                bytes: file.bytes,
            })
            .await;
        let stored = match upload {
            Ok(stored) => stored,
            Err(e) => {
                discard_files(state, &uploaded).await;
                return Err(e.into());
            }
        };
        uploaded.push(UploadedFile {
            file_name: file.file_name,
            file_url: stored.url,
            file_id: stored.file_id,
            uploaded_at: Utc::now(),
        });
    }
    Ok(uploaded)
}

/// Remove files that were uploaded for a write that did not happen.
async fn discard_files(state: &AppState, files: &[UploadedFile]) {
    for file in files {
        if let Err(e) = state.media.delete(&file.file_id).await {
            tracing::warn!(file_id = %file.file_id, error = %e, "failed to delete orphaned task file");
        }
    }
}

fn insert_task(state: &AppState, task: Task) -> Result<TaskView, AppError> {
    let db = state.db()?;
    db.insert_task(&task)?;
    Ok(db.populate_task(task)?)
}

fn apply_changes(state: &AppState, task_id: &str, changes: &TaskChanges) -> Result<TaskView, AppError> {
    let db = state.db()?;
    if !db.update_task(task_id, changes)? {
        return Err(AppError::NotFound(NOT_FOUND.into()));
    }
    let task = db
        .get_task(task_id)?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.into()))?;
    Ok(db.populate_task(task)?)
}

/// Insert `task`, or undo its uploads if the insert fails.
async fn save_new_task(state: &AppState, task: Task) -> Result<TaskView, AppError> {
    let uploaded = task.uploaded_files.clone();
    let result = insert_task(state, task);
    if result.is_err() {
        discard_files(state, &uploaded).await;
    }
    result
}

fn due_date_field(form: &Submission) -> Result<Option<chrono::DateTime<Utc>>, AppError> {
    match form.non_empty("dueDate") {
        Some(raw) => parse_due_date(&raw)
            .map(Some)
            .ok_or_else(|| AppError::BadRequest(format!("Invalid due date: {raw}"))),
        None => Ok(None),
    }
}

fn priority_field(form: &Submission) -> Result<Option<Priority>, AppError> {
    form.non_empty("priority")
        .map(|p| Priority::from_str(&p).map_err(AppError::BadRequest))
        .transpose()
}

fn status_field(form: &Submission) -> Result<Option<TaskStatus>, AppError> {
    form.non_empty("status")
        .map(|s| TaskStatus::from_str(&s).map_err(AppError::BadRequest))
        .transpose()
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

pub async fn create(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    mut form: Submission,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let (Some(title), Some(_)) = (form.non_empty("title"), form.non_empty("dueDate")) else {
        return Err(AppError::bad_request("Title and due date are required"));
    };
    let due_date = due_date_field(&form)?
        .ok_or_else(|| AppError::bad_request("Title and due date are required"))?;
    let priority = priority_field(&form)?.unwrap_or_default();
    let status = status_field(&form)?.unwrap_or_default();
    let members = members_field(&state, &form)?.unwrap_or_default();
    let labels = clean_labels(form.string_list("labels")?.unwrap_or_default());

    let uploaded_files = upload_files(&state, form.take_files("files")).await?;

    let now = Utc::now();
    let task = Task {
        id: uuid::Uuid::new_v4().to_string(),
        title,
        description: form.text("description").unwrap_or_default(),
        members,
        labels,
        due_date,
        due_time: form.text("dueTime").unwrap_or_default(),
        group: form.text("group").unwrap_or_default(),
        priority,
        uploaded_files,
        created_by: user.id.clone(),
        status,
        created_at: now,
        updated_at: now,
    };

    let task_id = task.id.clone();
    let view = save_new_task(&state, task).await?;
    tracing::info!(%task_id, user_id = %user.id, "created task");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Task created successfully",
            "task": view,
        })),
    ))
}

pub async fn all(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    QueryParams(query): QueryParams<TaskQuery>,
) -> Result<Json<Value>, AppError> {
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(|s| TaskStatus::from_str(s).map_err(AppError::BadRequest))
        .transpose()?;
    let mut filter = ListFilter {
        status,
        ..Default::default()
    };
    if let Some(raw) = query.due_date.as_deref().filter(|s| !s.trim().is_empty()) {
        let day = parse_day(raw).ok_or_else(|| AppError::BadRequest(format!("Invalid date: {raw}")))?;
        filter = filter.on_day(day);
    }

    let db = state.db()?;
    let tasks = db
        .list_tasks_for_user(&user.id, &filter)?
        .into_iter()
        .map(|t| db.populate_task(t))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(json!({ "success": true, "tasks": tasks })))
}

pub async fn update(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(task_id): Path<String>,
    mut form: Submission,
) -> Result<Json<Value>, AppError> {
    let visible = state
        .db()?
        .get_task(&task_id)?
        .is_some_and(|t| t.is_visible_to(&user.id));
    if !visible {
        return Err(AppError::NotFound(NOT_FOUND.into()));
    }

    let title = form.text("title");
    if title.as_deref().is_some_and(str::is_empty) {
        return Err(AppError::bad_request("Title cannot be empty"));
    }
    let mut changes = TaskChanges {
        title,
        description: form.text("description"),
        members: members_field(&state, &form)?,
        labels: form.string_list("labels")?.map(clean_labels),
        due_date: due_date_field(&form)?,
        due_time: form.text("dueTime"),
        group: form.text("group"),
        priority: priority_field(&form)?,
        status: status_field(&form)?,
        new_files: Vec::new(),
    };
    changes.new_files = upload_files(&state, form.take_files("files")).await?;

    let result = apply_changes(&state, &task_id, &changes);
    if result.is_err() {
        discard_files(&state, &changes.new_files).await;
    }
    let view = result?;

    Ok(Json(json!({
        "success": true,
        "message": "Task updated successfully",
        "task": view,
    })))
}

pub async fn remove(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(task_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let task = state
        .db()?
        .get_task(&task_id)?
        .filter(|t| t.created_by == user.id)
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.into()))?;

    for file in &task.uploaded_files {
        if let Err(e) = state.media.delete(&file.file_id).await {
            tracing::warn!(task_id = %task.id, file_id = %file.file_id, error = %e, "failed to delete task file");
        }
    }

    if !state.db()?.delete_task(&task.id)? {
        return Err(AppError::NotFound(NOT_FOUND.into()));
    }
    tracing::info!(task_id = %task.id, "deleted task");

    Ok(Json(json!({ "success": true, "message": "Task deleted successfully" })))
}
