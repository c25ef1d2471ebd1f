//! Image upload proxy to Cloudinary.
//!
//! The dashboard never talks to the media host directly. Uploads go through
//! here as an unsigned upload with the configured preset.

use std::time::Duration;

use reqwest::Client;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument};

use crate::config::MediaConfig;

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Upper bound on a single upload request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur when uploading media.
#[derive(Debug, Error)]
pub enum MediaError {
    /// The file is not an image.
    #[error("unsupported content type: {0}")]
    UnsupportedType(String),

    /// The file exceeds [`MAX_UPLOAD_BYTES`].
    #[error("file is too large ({0} bytes, max 10 MiB)")]
    TooLarge(usize),

    /// The file is empty.
    #[error("file is empty")]
    Empty,

    /// HTTP request failed.
    #[error("Media request failed: {0}")]
    Request(String),

    /// The media host rejected the upload.
    #[error("Media host returned {status}: {message}")]
    Api { status: u16, message: String },

    /// Failed to parse the response.
    #[error("Media response error: {0}")]
    Response(String),
}

impl MediaError {
    /// Whether the upload itself was unacceptable, as opposed to a host failure.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::UnsupportedType(_) | Self::TooLarge(_) | Self::Empty)
    }
}

/// A stored image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedMedia {
    pub url: String,
    pub public_id: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
    width: Option<u32>,
    height: Option<u32>,
}

/// Check an upload before it leaves the server.
///
/// # Errors
///
/// Returns `MediaError::UnsupportedType` unless the content type is `image/*`,
/// `MediaError::Empty` for zero bytes and `MediaError::TooLarge` above 10 MiB.
pub fn validate_upload(content_type: &str, len: usize) -> Result<(), MediaError> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if !essence.starts_with("image/") || essence.len() == "image/".len() {
        return Err(MediaError::UnsupportedType(content_type.to_string()));
    }
    if len == 0 {
        return Err(MediaError::Empty);
    }
    if len > MAX_UPLOAD_BYTES {
        return Err(MediaError::TooLarge(len));
    }
    Ok(())
}

/// Cloudinary upload client.
#[derive(Clone)]
pub struct MediaClient {
    client: Client,
    upload_url: String,
    upload_preset: SecretString,
    folder: Option<String>,
}

impl std::fmt::Debug for MediaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaClient")
            .field("upload_url", &self.upload_url)
            .field("upload_preset", &"[REDACTED]")
            .field("folder", &self.folder)
            .finish_non_exhaustive()
    }
}

impl MediaClient {
    /// Create a new media client.
    #[must_use]
    pub fn new(config: &MediaConfig) -> Self {
        Self::with_timeout(config, REQUEST_TIMEOUT)
    }

    fn with_timeout(config: &MediaConfig, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            upload_url: format!("{}/{}/image/upload", config.api_base, config.cloud_name),
            upload_preset: config.upload_preset.clone(),
            folder: config.folder.clone(),
        }
    }

    /// Endpoint uploads are posted to.
    #[must_use]
    pub fn upload_url(&self) -> &str {
        &self.upload_url
    }

    /// Upload an image and return where it is served from.
    ///
    /// # Errors
    ///
    /// Returns a client-side `MediaError` if the file fails validation, or
    /// `MediaError::Request`/`Api`/`Response` if the media host fails.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn upload(
        &self,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedMedia, MediaError> {
        validate_upload(content_type, bytes.len())?;

        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(content_type)
            .map_err(|e| MediaError::UnsupportedType(e.to_string()))?;
        let mut form = Form::new()
            .part("file", part)
            .text("upload_preset", self.upload_preset.expose_secret().to_string());
        if let Some(folder) = &self.folder {
            form = form.text("folder", folder.clone());
        }

        let response = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| MediaError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MediaError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| MediaError::Response(e.to_string()))?;
        info!(public_id = %body.public_id, "Image uploaded");

        Ok(UploadedMedia {
            url: body.secure_url,
            public_id: body.public_id,
            width: body.width,
            height: body.height,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config(api_base: &str) -> MediaConfig {
        MediaConfig {
            cloud_name: "zolar".to_string(),
            upload_preset: SecretString::from("zolar_unsigned_v2"),
            folder: None,
            api_base: api_base.to_string(),
        }
    }

    #[test]
    fn test_validate_upload_accepts_images() {
        assert!(validate_upload("image/jpeg", 1024).is_ok());
        assert!(validate_upload("IMAGE/PNG", 1024).is_ok());
        assert!(validate_upload("image/webp; charset=binary", MAX_UPLOAD_BYTES).is_ok());
    }

    #[test]
    fn test_validate_upload_rejects() {
        assert!(matches!(
            validate_upload("application/pdf", 10),
            Err(MediaError::UnsupportedType(_))
        ));
        assert!(matches!(
            validate_upload("image/", 10),
            Err(MediaError::UnsupportedType(_))
        ));
        assert!(matches!(validate_upload("image/png", 0), Err(MediaError::Empty)));
        assert!(matches!(
            validate_upload("image/png", MAX_UPLOAD_BYTES + 1),
            Err(MediaError::TooLarge(_))
        ));
    }

    #[test]
    fn test_upload_url_and_debug() {
        let client = MediaClient::new(&config("https://api.cloudinary.com/v1_1"));
        assert_eq!(
            client.upload_url(),
            "https://api.cloudinary.com/v1_1/zolar/image/upload"
        );
        assert!(!format!("{client:?}").contains("zolar_unsigned_v2"));
    }

    #[tokio::test]
    async fn test_upload_gives_up_on_hung_host() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hold = tokio::spawn(async move {
            let mut open = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                open.push(socket);
            }
        });

        let client = MediaClient::with_timeout(
            &config(&format!("http://{addr}")),
            Duration::from_millis(200),
        );
        let result = tokio::time::timeout(
            Duration::from_secs(5),
            client.upload("hero.png", "image/png", vec![0x89, 0x50, 0x4e, 0x47]),
        )
        .await
        .expect("upload should time out on its own");
        assert!(matches!(result, Err(MediaError::Request(_))));
        hold.abort();
    }

    #[tokio::test]
    async fn test_upload_rejects_before_network() {
        let client = MediaClient::new(&config("http://127.0.0.1:9"));
        let err = client
            .upload("notes.txt", "text/plain", b"hello".to_vec())
            .await
            .unwrap_err();
        assert!(err.is_client_error());
    }
}
