use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use thiserror::Error;

use crate::auth::{AuthProfile, ServiceKind};
use crate::transport::{require_endpoint, AuthenticatedTransport, StageError, REQUEST_TIMEOUT};
use crate::types::RawImage;

/// Resource path of the OCR endpoint, relative to the service URL.
pub const OCR_RESOURCE: &str = "ocr";

#[derive(Debug, Error)]
pub enum OcrError {
    #[error(transparent)]
    Stage(#[from] StageError),
    #[error("no text could be extracted from the image")]
    EmptyExtraction,
}

#[derive(Debug, Deserialize)]
struct OcrResponse {
    text: Option<String>,
    #[serde(default)]
    filename: Option<String>,
    /// The OCR service reports its own failures in-band with a 200 status.
    #[serde(default)]
    error: Option<String>,
}

/// Client for the remote OCR service.
pub struct OcrClient {
    transport: AuthenticatedTransport,
    endpoint: String,
}

impl OcrClient {
    pub fn from_profile(profile: &AuthProfile) -> Result<Self, StageError> {
        Self::with_timeout(profile, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(profile: &AuthProfile, timeout: Duration) -> Result<Self, StageError> {
        let endpoint = require_endpoint(ServiceKind::Ocr, profile, OCR_RESOURCE)?;
        let transport = AuthenticatedTransport::with_timeout(ServiceKind::Ocr, profile, timeout)?;
        Ok(Self { transport, endpoint })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Upload `image` as the multipart `file` field and return the recognized text.
    pub async fn extract_text(&self, image: RawImage) -> Result<String, OcrError> {
        let (bytes, filename) = image.into_parts();
        let form = Form::new().part("file", Part::bytes(bytes).file_name(filename));

        let request = self.transport.post(&self.endpoint).await?.multipart(form);
        let response = self.transport.send(request).await?;
        let body: OcrResponse = self.transport.read_json(response).await?;

        match body {
            OcrResponse { text: Some(text), filename, .. } => {
                if text.is_empty() {
                    return Err(OcrError::EmptyExtraction);
                }
                tracing::debug!(chars = text.len(), filename = ?filename, "OCR text received");
                Ok(text)
            }
            OcrResponse { text: None, error: Some(error), .. } => Err(StageError::Decode {
                service: ServiceKind::Ocr,
                message: format!("service reported: {error}"),
            }
            .into()),
            OcrResponse { text: None, error: None, .. } => Err(StageError::Decode {
                service: ServiceKind::Ocr,
                message: "response has no `text` field".to_string(),
            }
            .into()),
        }
    }
}
