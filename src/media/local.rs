use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use uuid::Uuid;

use super::{MediaError, MediaStore, MediaUpload, StoredMedia, sanitize_file_name};

/// Route prefix the server mounts the local store under.
pub const LOCAL_URL_PREFIX: &str = "/uploads";

/// Disk-backed store for development and tests. Files land in
/// `<root>/<folder>/<uuid>-<name>` and are served from [`LOCAL_URL_PREFIX`].
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalStore { root: root.into() }
    }

    /// Resolve a file id to a path under the root, refusing anything that
    /// could escape it.
    fn path_for(&self, file_id: &str) -> Result<PathBuf, MediaError> {
        let rel = Path::new(file_id);
        let safe = !file_id.is_empty()
            && rel
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(MediaError::InvalidId(file_id.to_string()));
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl MediaStore for LocalStore {
    async fn upload(&self, file: MediaUpload) -> Result<StoredMedia, MediaError> {
        let stored_name = format!(
            "{}-{}",
            Uuid::new_v4().simple(),
            sanitize_file_name(&file.file_name)
        );
        let file_id = format!("{}/{stored_name}", file.folder);
        let path = self.path_for(&file_id)?;
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&path, &file.bytes).await?;
        Ok(StoredMedia {
            url: format!("{LOCAL_URL_PREFIX}/{file_id}"),
            file_id,
        })
    }

    async fn delete(&self, file_id: &str) -> Result<(), MediaError> {
        let path = self.path_for(file_id)?;
        tokio::fs::remove_file(path).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "local"
    }
}
