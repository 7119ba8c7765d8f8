//! Where uploaded files live. Profile pictures and task attachments are
//! pushed to an image host and referenced by URL and host-side file id.

mod imagekit;
mod local;

pub use imagekit::ImageKit;
pub use local::{LOCAL_URL_PREFIX, LocalStore};

use async_trait::async_trait;
use thiserror::Error;

/// Folder for profile pictures.
pub const PROFILE_FOLDER: &str = "profiles";
/// Folder for task attachments.
pub const TASK_FOLDER: &str = "tasks";

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("image host request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("image host rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("media storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid file id: {0}")]
    InvalidId(String),
}

/// A file ready to be stored.
#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub file_name: String,
    pub folder: &'static str,
    pub bytes: Vec<u8>,
}

/// What the store hands back for a stored file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMedia {
    pub url: String,
    pub file_id: String,
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn upload(&self, file: MediaUpload) -> Result<StoredMedia, MediaError>;

    async fn delete(&self, file_id: &str) -> Result<(), MediaError>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Reduce a client-supplied file name to a safe single path segment.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}
