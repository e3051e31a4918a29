//! # Upload client
//!
//! Sends one pasted file to the configured upload server and returns the
//! public URL it was stored under.
//!
//! ## Wire contract
//!
//! - **Endpoint**: `POST {url}/api/attachment/upload`
//! - **Body**: `multipart/form-data` with the raw bytes in the `file` field
//! - **Auth**: `authorizeSDK: <token>` header
//! - **Response**: 2xx JSON, public URL at `data.path`
//!
//! ```json
//! { "data": { "path": "https://img.example.com/a1b2.png" } }
//! ```
//!
//! ## Error Handling
//!
//! - **Transport errors**: [`UploadError::Http`]
//! - **Non-2xx status**: [`UploadError::Status`], with a short body excerpt
//! - **Body is not JSON**: [`UploadError::InvalidResponse`]
//! - **`data.path` missing, empty or not a string**: [`UploadError::MissingUrl`];
//!   a successful status alone never yields a link
//!
//! Nothing is retried.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use thiserror::Error;
use url::Url;

use crate::auth::AUTHORIZE_HEADER;
use crate::clipboard::ClipboardFile;
use crate::config::Settings;

pub mod http_client;

use http_client::create_shared_client;

/// Path appended to the configured base URL
pub const UPLOAD_PATH: &str = "/api/attachment/upload";

/// Multipart field carrying the file
pub const UPLOAD_FIELD: &str = "file";

/// JSON pointer to the public URL in the response
const URL_POINTER: &str = "/data/path";

/// Longest response body excerpt kept in a status error
const MAX_BODY_EXCERPT: usize = 200;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("upload server URL or token is not configured")]
    NotConfigured,

    #[error("invalid upload URL {url:?}: {source}")]
    InvalidEndpoint {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("upload request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upload rejected with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("upload response is not valid JSON: {0}")]
    InvalidResponse(#[source] serde_json::Error),

    #[error("upload response has no image URL at data.path")]
    MissingUrl,
}

/// Sends pasted files somewhere and reports where they ended up
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Upload `file`, returning its public URL
    async fn upload(&self, file: &ClipboardFile, settings: &Settings)
    -> Result<String, UploadError>;
}

#[async_trait]
impl<T: Uploader + ?Sized> Uploader for Arc<T> {
    async fn upload(
        &self,
        file: &ClipboardFile,
        settings: &Settings,
    ) -> Result<String, UploadError> {
        (**self).upload(file, settings).await
    }
}

/// Build the upload endpoint from the configured base URL
pub fn upload_endpoint(base_url: &str) -> Result<Url, UploadError> {
    let base = base_url.trim().trim_end_matches('/');
    Url::parse(&format!("{base}{UPLOAD_PATH}")).map_err(|source| UploadError::InvalidEndpoint {
        url: base_url.to_string(),
        source,
    })
}

/// Pull the public URL out of a success response
pub fn extract_url(body: &serde_json::Value) -> Option<String> {
    body.pointer(URL_POINTER)
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
}

fn body_excerpt(body: &str) -> String {
    let body = body.trim();
    if body.chars().count() <= MAX_BODY_EXCERPT {
        return body.to_string();
    }
    let excerpt: String = body.chars().take(MAX_BODY_EXCERPT - 3).collect();
    format!("{excerpt}...")
}

/// Multipart HTTP uploader
pub struct HttpUploader {
    client: Arc<Client>,
}

impl HttpUploader {
    pub fn with_client(client: Arc<Client>) -> Self {
        Self { client }
    }

    pub fn http_client(&self) -> Arc<Client> {
        Arc::clone(&self.client)
    }

    fn file_part(file: &ClipboardFile) -> Result<Part, UploadError> {
        let name = file.file_name();
        // Hosts occasionally report bare types like "image"
        match Part::bytes(file.data.clone())
            .file_name(name.clone())
            .mime_str(&file.mime_type)
        {
            Ok(part) => Ok(part),
            Err(_) => Ok(Part::bytes(file.data.clone())
                .file_name(name)
                .mime_str("application/octet-stream")?),
        }
    }
}

impl Default for HttpUploader {
    /// # Panics
    ///
    /// Panics if the shared HTTP client cannot be built.
    fn default() -> Self {
        Self::with_client(create_shared_client().expect("Failed to create HTTP client"))
    }
}

#[async_trait]
impl Uploader for HttpUploader {
    async fn upload(
        &self,
        file: &ClipboardFile,
        settings: &Settings,
    ) -> Result<String, UploadError> {
        if !settings.is_complete() {
            return Err(UploadError::NotConfigured);
        }
        let token = settings.token().ok_or(UploadError::NotConfigured)?;
        let endpoint = upload_endpoint(&settings.url)?;

        let form = Form::new().part(UPLOAD_FIELD, Self::file_part(file)?);

        tracing::debug!(
            "Uploading {} ({} bytes, {}) to {}",
            file.file_name(),
            file.data.len(),
            file.mime_type,
            endpoint
        );

        let response = self
            .client
            .post(endpoint)
            .header(AUTHORIZE_HEADER, token)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(UploadError::Status {
                status: status.as_u16(),
                body: body_excerpt(&body),
            });
        }

        let json: serde_json::Value =
            serde_json::from_str(&body).map_err(UploadError::InvalidResponse)?;
        let url = extract_url(&json).ok_or(UploadError::MissingUrl)?;

        tracing::debug!("Uploaded {} -> {}", file.file_name(), url);
        Ok(url)
    }
}
