use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::AppState;
use super::errors::AppError;
use super::form::{JsonBody, Submission};
use super::session::AuthUser;
use crate::auth::{AuthError, hash_password, verify_password};
use crate::db::ProfileChanges;
use crate::media::{MediaUpload, PROFILE_FOLDER};
use crate::models::{MAX_BIO_CHARS, MIN_PASSWORD_CHARS, User, UserSummary, normalize_email};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterRequest {
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    phone_no: Option<String>,
    password: Option<String>,
    confirm_password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

/// The account fields returned alongside a fresh token.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Account<'a> {
    id: &'a str,
    first_name: &'a str,
    last_name: &'a str,
    email: &'a str,
    phone_no: &'a str,
    profile_image_url: &'a str,
}

impl<'a> From<&'a User> for Account<'a> {
    fn from(u: &'a User) -> Self {
        Account {
            id: &u.id,
            first_name: &u.first_name,
            last_name: &u.last_name,
            email: &u.email,
            phone_no: &u.phone_no,
            profile_image_url: &u.profile_image_url,
        }
    }
}

fn session_response(state: &AppState, user: &User, message: &str) -> Result<Value, AppError> {
    let token = state.tokens.issue(&user.id)?;
    Ok(json!({
        "success": true,
        "message": message,
        "user": Account::from(user),
        "token": token,
    }))
}

/// Run an argon2 hash or check on the blocking pool. Never call it with the
/// database locked.
async fn off_thread<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AuthError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(format!("password task failed: {e}")))?
        .map_err(AppError::from)
}

fn present(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

pub async fn register(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let (
        Some(first_name),
        Some(last_name),
        Some(email),
        Some(phone_no),
        Some(password),
        Some(confirm_password),
    ) = (
        present(req.first_name),
        present(req.last_name),
        present(req.email),
        present(req.phone_no),
        req.password.filter(|p| !p.is_empty()),
        req.confirm_password.filter(|p| !p.is_empty()),
    )
    else {
        return Err(AppError::bad_request("All fields are required"));
    };

    if password != confirm_password {
        return Err(AppError::bad_request("Passwords do not match"));
    }
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_CHARS} characters long"
        )));
    }

    let email = normalize_email(&email);
    if state.db()?.get_user_by_email(&email)?.is_some() {
        return Err(AppError::bad_request("User already exists with this email"));
    }
    let password_hash = off_thread(move || hash_password(&password)).await?;

    let now = Utc::now();
    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        first_name,
        last_name,
        email,
        phone_no,
        password_hash,
        profile_image_url: String::new(),
        profile_file_id: String::new(),
        location: String::new(),
        designation: String::new(),
        bio: String::new(),
        created_at: now,
        updated_at: now,
    };
    // A concurrent registration surfaces here as DuplicateEmail.
    state.db()?.insert_user(&user)?;

    tracing::info!(user_id = %user.id, "registered user");
    let body = session_response(&state, &user, "User registered successfully")?;
    Ok((StatusCode::CREATED, Json(body)))
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    let (Some(email), Some(password)) = (present(req.email), req.password.filter(|p| !p.is_empty()))
    else {
        return Err(AppError::bad_request("Email and password are required"));
    };

    let invalid = || AppError::Unauthorized("Invalid credentials".into());
    let user = state
        .db()?
        .get_user_by_email(&normalize_email(&email))?
        .ok_or_else(invalid)?;
    let hash = user.password_hash.clone();
    if !off_thread(move || verify_password(&password, &hash)).await? {
        return Err(invalid());
    }

    Ok(Json(session_response(&state, &user, "Login successful")?))
}

pub async fn data(AuthUser(user): AuthUser) -> Json<Value> {
    Json(json!({ "success": true, "user": user }))
}

pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    mut form: Submission,
) -> Result<Json<Value>, AppError> {
    let mut changes = ProfileChanges {
        first_name: form.text("firstName"),
        last_name: form.text("lastName"),
        phone_no: form.text("phoneNo"),
        location: form.text("location"),
        designation: form.text_any(&["Designation", "designation"]),
        bio: form.text("bio"),
        profile_image: None,
    };

    let blank = |v: &Option<String>| v.as_deref().is_some_and(str::is_empty);
    if blank(&changes.first_name) || blank(&changes.last_name) {
        return Err(AppError::bad_request("First and last name cannot be empty"));
    }
    if let Some(bio) = &changes.bio {
        if bio.chars().count() > MAX_BIO_CHARS {
            return Err(AppError::BadRequest(format!(
                "Bio cannot be longer than {MAX_BIO_CHARS} characters"
            )));
        }
    }

    if let Some(image) = form.take_files("profileImage").into_iter().next() {
        if !user.profile_file_id.is_empty() {
            if let Err(e) = state.media.delete(&user.profile_file_id).await {
                tracing::warn!(user_id = %user.id, error = %e, "failed to delete old profile image");
            }
        }
        let stored = state
            .media
            .upload(MediaUpload {
                file_name: image.file_name,
                folder: PROFILE_FOLDER,
                bytes: image.bytes,
            })
            .await?;
        changes.profile_image = Some((stored.url, stored.file_id));
    }

    let db = state.db()?;
    if !db.update_user_profile(&user.id, &changes)? {
        return Err(AppError::NotFound("User not found".into()));
    }
    let updated = db
        .get_user(&user.id)?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    Ok(Json(json!({
        "success": true,
        "message": "Profile updated successfully",
        "user": updated,
    })))
}

pub async fn all(State(state): State<AppState>, _caller: AuthUser) -> Result<Json<Value>, AppError> {
    let users: Vec<UserSummary> = state.db()?.list_users()?.iter().map(User::summary).collect();
    Ok(Json(json!({ "success": true, "users": users })))
}
