use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use super::{MediaError, MediaStore, MediaUpload, StoredMedia};

pub const DEFAULT_UPLOAD_URL: &str = "https://upload.imagekit.io/api/v1/files/upload";
pub const DEFAULT_API_URL: &str = "https://api.imagekit.io/v1";

/// ImageKit client. Authenticates with the private key as the basic-auth user.
#[derive(Clone)]
pub struct ImageKit {
    client: reqwest::Client,
    private_key: String,
    upload_url: String,
    api_url: String,
}

impl std::fmt::Debug for ImageKit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageKit")
            .field("upload_url", &self.upload_url)
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    file_id: String,
    url: String,
}

impl ImageKit {
    pub fn new(private_key: impl Into<String>) -> Self {
        ImageKit {
            client: reqwest::Client::new(),
            private_key: private_key.into(),
            upload_url: DEFAULT_UPLOAD_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
        }
    }

    pub fn with_endpoints(mut self, upload_url: Option<String>, api_url: Option<String>) -> Self {
        if let Some(url) = upload_url {
            self.upload_url = url;
        }
        if let Some(url) = api_url {
            self.api_url = url.trim_end_matches('/').to_string();
        }
        self
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, MediaError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(MediaError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl MediaStore for ImageKit {
    async fn upload(&self, file: MediaUpload) -> Result<StoredMedia, MediaError> {
        let part = Part::bytes(file.bytes).file_name(file.file_name.clone());
        let form = Form::new()
            .part("file", part)
            .text("fileName", file.file_name)
            .text("folder", file.folder);

        let resp = self
            .client
            .post(&self.upload_url)
            .basic_auth(&self.private_key, Some(""))
            .multipart(form)
            .send()
            .await?;
        let uploaded: UploadResponse = Self::check(resp).await?.json().await?;
        Ok(StoredMedia {
            url: uploaded.url,
            file_id: uploaded.file_id,
        })
    }

    async fn delete(&self, file_id: &str) -> Result<(), MediaError> {
        if file_id.is_empty() || file_id.contains('/') {
            return Err(MediaError::InvalidId(file_id.to_string()));
        }
        let resp = self
            .client
            .delete(format!("{}/files/{file_id}", self.api_url))
            .basic_auth(&self.private_key, Some(""))
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "imagekit"
    }
}
