//! Server configuration, assembled by the `serve` command from flags and env vars.

use std::path::PathBuf;
use std::sync::Arc;

use crate::auth::TokenKeys;
use crate::media::{ImageKit, LocalStore, MediaStore};

/// Largest accepted uploaded file.
pub const MAX_UPLOAD_BYTES: usize = 2 * 1024 * 1024;
/// Most files accepted in one task request.
pub const MAX_TASK_FILES: usize = 5;
/// Request body ceiling: every file at the limit plus room for form fields.
pub const MAX_BODY_BYTES: usize = MAX_UPLOAD_BYTES * MAX_TASK_FILES + 256 * 1024;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub token_days: i64,
    pub imagekit_private_key: Option<String>,
    pub imagekit_upload_url: Option<String>,
    pub imagekit_api_url: Option<String>,
    pub upload_dir: PathBuf,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn token_keys(&self) -> TokenKeys {
        TokenKeys::new(&self.jwt_secret, chrono::Duration::days(self.token_days))
    }

    /// ImageKit when a private key is configured, otherwise files on local disk.
    pub fn media_store(&self) -> Arc<dyn MediaStore> {
        match self.imagekit_private_key.as_deref().filter(|k| !k.is_empty()) {
            Some(key) => Arc::new(ImageKit::new(key).with_endpoints(
                self.imagekit_upload_url.clone(),
                self.imagekit_api_url.clone(),
            )),
            None => Arc::new(LocalStore::new(self.upload_dir.clone())),
        }
    }

    /// Directory to serve under `/uploads`, if files are kept locally.
    pub fn local_upload_dir(&self) -> Option<&PathBuf> {
        match self.imagekit_private_key.as_deref() {
            Some(k) if !k.is_empty() => None,
            _ => Some(&self.upload_dir),
        }
    }
}
