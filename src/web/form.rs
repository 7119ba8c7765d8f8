//! Request bodies. Profile and task forms arrive either as JSON or as
//! `multipart/form-data` with attachments; both are flattened into a
//! [`Submission`] of named values plus uploaded files.

use axum::Json;
use axum::body::Bytes;
use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Multipart, Query, Request};
use axum::http::request::Parts;
use axum::http::{StatusCode, header};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::errors::AppError;
use crate::config::MAX_UPLOAD_BYTES;

/// A file part from a multipart body.
#[derive(Debug, Clone)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Named form values and files. Repeated fields collect into arrays.
#[derive(Debug, Default, Clone)]
pub struct Submission {
    fields: Map<String, Value>,
    files: Vec<FilePart>,
}

impl Submission {
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Submission {
            fields,
            files: Vec::new(),
        }
    }

    pub fn has(&self, key: &str) -> bool {
        self.fields.get(key).is_some_and(|v| !v.is_null())
    }

    /// Scalar value as trimmed text. Absent and `null` give `None`.
    pub fn text(&self, key: &str) -> Option<String> {
        match self.fields.get(key)? {
            Value::Null => None,
            Value::String(s) => Some(s.trim().to_string()),
            Value::Array(items) => items.last().and_then(scalar_text),
            other => scalar_text(other),
        }
    }

    /// Like [`text`](Self::text) but blank counts as absent.
    pub fn non_empty(&self, key: &str) -> Option<String> {
        self.text(key).filter(|s| !s.is_empty())
    }

    /// First key present, for fields the front end spells more than one way.
    pub fn text_any(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|k| self.text(k))
    }

    /// A list field. Accepts a JSON array, repeated form fields, a form field
    /// holding a JSON-encoded array, or comma-separated text.
    pub fn string_list(&self, key: &str) -> Result<Option<Vec<String>>, AppError> {
        match self.fields.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => string_list(v)
                .map(Some)
                .map_err(|e| AppError::BadRequest(format!("{key}: {e}"))),
        }
    }

    pub fn files(&self) -> &[FilePart] {
        &self.files
    }

    /// Remove and return the files uploaded under `field`.
    pub fn take_files(&mut self, field: &str) -> Vec<FilePart> {
        let (taken, rest) = std::mem::take(&mut self.files)
            .into_iter()
            .partition(|f| f.field == field);
        self.files = rest;
        taken
    }

    fn push_field(&mut self, name: String, value: Value) {
        match self.fields.get_mut(&name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                self.fields.insert(name, value);
            }
        }
    }
}

fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Coerce a loosely-shaped value into a list of trimmed, non-empty strings.
pub fn string_list(value: &Value) -> Result<Vec<String>, String> {
    let mut out = Vec::new();
    collect_strings(value, &mut out, 0)?;
    Ok(out)
}

/// `decoded` counts JSON-encoded strings unwrapped on the way down; array
/// nesting alone does not count.
fn collect_strings(value: &Value, out: &mut Vec<String>, decoded: u8) -> Result<(), String> {
    if decoded > 2 {
        return Err("list is nested too deeply".to_string());
    }
    match value {
        Value::Null => {}
        Value::Array(items) => {
            for item in items {
                collect_strings(item, out, decoded)?;
            }
        }
        Value::String(s) => {
            let s = s.trim();
            if s.starts_with('[') {
                let parsed: Value =
                    serde_json::from_str(s).map_err(|e| format!("invalid JSON list: {e}"))?;
                collect_strings(&parsed, out, decoded + 1)?;
            } else {
                out.extend(
                    s.split(',')
                        .map(str::trim)
                        .filter(|p| !p.is_empty())
                        .map(String::from),
                );
            }
        }
        Value::Number(n) => out.push(n.to_string()),
        Value::Bool(_) | Value::Object(_) => {
            return Err("expected a list of strings".to_string());
        }
    }
    Ok(())
}

/// Map an axum rejection onto the API's error body, keeping 413.
fn rejection(status: StatusCode, text: String) -> AppError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Request body is too large".into())
    } else {
        AppError::BadRequest(text)
    }
}

fn multipart_error(e: MultipartError) -> AppError {
    rejection(e.status(), e.body_text())
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"))
}

impl<S> FromRequest<S> for Submission
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_multipart(&req) {
            let body = Bytes::from_request(req, state)
                .await
                .map_err(|e| rejection(e.status(), e.body_text()))?;
            if body.iter().all(u8::is_ascii_whitespace) {
                return Ok(Submission::default());
            }
            return match serde_json::from_slice::<Value>(&body) {
                Ok(Value::Object(fields)) => Ok(Submission::from_fields(fields)),
                Ok(_) => Err(AppError::bad_request("Request body must be a JSON object")),
                Err(e) => Err(AppError::BadRequest(format!("Invalid JSON body: {e}"))),
            };
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| rejection(e.status(), e.body_text()))?;
        let mut submission = Submission::default();

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field
                .name()
                .unwrap_or_default()
                .trim_end_matches("[]")
                .to_string();
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let bytes = field.bytes().await.map_err(multipart_error)?;
                    if file_name.is_empty() && bytes.is_empty() {
                        // An untouched file input.
                        continue;
                    }
                    if bytes.len() > MAX_UPLOAD_BYTES {
                        return Err(AppError::PayloadTooLarge(format!(
                            "File {file_name} exceeds the {} MB limit",
                            MAX_UPLOAD_BYTES / (1024 * 1024)
                        )));
                    }
                    submission.files.push(FilePart {
                        field: name,
                        file_name,
                        bytes: bytes.to_vec(),
                    });
                }
                None => {
                    let text = field.text().await.map_err(multipart_error)?;
                    submission.push_field(name, Value::String(text));
                }
            }
        }
        Ok(submission)
    }
}

/// `Json<T>` whose rejections use the API's error body.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(JsonRejection::MissingJsonContentType(_)) => {
                Err(AppError::bad_request("Expected a JSON request body"))
            }
            Err(e) => Err(rejection(e.status(), e.body_text())),
        }
    }
}

/// `Query<T>` whose rejections use the API's error body.
pub struct QueryParams<T>(pub T);

impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| QueryParams(value))
            .map_err(|e| AppError::BadRequest(e.body_text()))
    }
}
