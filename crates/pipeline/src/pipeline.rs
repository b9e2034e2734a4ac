use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{field, Instrument, Span};
use uuid::Uuid;

use crate::auth::{EnvProfiles, ProfileSource, ServiceKind};
use crate::parser::ParserClient;
use crate::recognizer::{OcrClient, OcrError};
use crate::transport::{StageError, REQUEST_TIMEOUT};
use crate::types::{BillProcessResult, ParsedFields, RawImage};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no image file provided")]
    MissingImage,
    #[error("OCR processing failed: {0}")]
    Ocr(#[source] StageError),
    #[error("no text could be extracted from the image")]
    EmptyExtraction,
}

impl From<OcrError> for PipelineError {
    fn from(e: OcrError) -> Self {
        match e {
            OcrError::Stage(stage) => PipelineError::Ocr(stage),
            OcrError::EmptyExtraction => PipelineError::EmptyExtraction,
        }
    }
}

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    AwaitingImage,
    OcrInFlight,
    ParseInFlight,
    Done,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStage::AwaitingImage => write!(f, "awaiting_image"),
            PipelineStage::OcrInFlight => write!(f, "ocr_in_flight"),
            PipelineStage::ParseInFlight => write!(f, "parse_in_flight"),
            PipelineStage::Done => write!(f, "done"),
        }
    }
}

/// Tracks one run through its stages and logs each transition.
struct Run {
    stage: PipelineStage,
}

impl Run {
    fn start() -> Self {
        Self { stage: PipelineStage::AwaitingImage }
    }

    fn advance(&mut self, next: PipelineStage) {
        tracing::debug!(from = %self.stage, to = %next, "pipeline stage");
        self.stage = next;
    }

    fn fail(self, error: PipelineError) -> PipelineError {
        tracing::warn!(stage = %self.stage, error = %error, "bill pipeline failed");
        error
    }
}

/// Orchestrates: validate image → OCR → parse → reconcile.
///
/// Profiles are re-resolved from the injected source on every run. Parsing is
/// best-effort: any parser failure yields [`BillProcessResult::degraded`].
#[derive(Clone)]
pub struct BillPipeline {
    profiles: Arc<dyn ProfileSource>,
    request_timeout: Duration,
}

impl BillPipeline {
    pub fn new(profiles: impl ProfileSource + 'static) -> Self {
        Self { profiles: Arc::new(profiles), request_timeout: REQUEST_TIMEOUT }
    }

    /// A pipeline reading service profiles from the process environment.
    pub fn from_env() -> Self {
        Self::new(EnvProfiles)
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Process one uploaded image. `None` or an empty upload fails without any network call.
    pub async fn process(&self, image: Option<RawImage>) -> Result<BillProcessResult, PipelineError> {
        let span = tracing::info_span!(
            "bill_pipeline",
            run_id = %Uuid::new_v4(),
            image_sha256 = field::Empty,
            image_bytes = field::Empty,
            content_type = field::Empty,
        );
        self.run(image).instrument(span).await
    }

    async fn run(&self, image: Option<RawImage>) -> Result<BillProcessResult, PipelineError> {
        let mut run = Run::start();

        let Some(image) = image.filter(|i| !i.is_empty()) else {
            return Err(run.fail(PipelineError::MissingImage));
        };
        let span = Span::current();
        span.record("image_sha256", image.fingerprint().as_str());
        span.record("image_bytes", image.len());
        span.record("content_type", image.content_type());
        let content_type = image.content_type().to_string();

        run.advance(PipelineStage::OcrInFlight);
        let text = match self.recognize(image).await {
            Ok(text) => text,
            Err(e) => return Err(run.fail(e)),
        };

        run.advance(PipelineStage::ParseInFlight);
        let result = match self.parse(&text).await {
            Ok(parsed) => BillProcessResult::from_parsed(&parsed, &text, &content_type),
            Err(e) => {
                tracing::warn!(
                    service = %e.service(),
                    error = %e,
                    "bill parsing failed, returning OCR text only"
                );
                BillProcessResult::degraded(&text, &content_type)
            }
        };

        run.advance(PipelineStage::Done);
        tracing::info!(
            merchant = %result.merchant_name,
            amount = %result.amount,
            category = %result.category,
            "bill processed"
        );
        Ok(result)
    }

    async fn recognize(&self, image: RawImage) -> Result<String, PipelineError> {
        let profile = self.profiles.resolve(ServiceKind::Ocr);
        let client = OcrClient::with_timeout(&profile, self.request_timeout).map_err(PipelineError::Ocr)?;
        Ok(client.extract_text(image).await?)
    }

    async fn parse(&self, text: &str) -> Result<ParsedFields, StageError> {
        let profile = self.profiles.resolve(ServiceKind::Parser);
        ParserClient::with_timeout(&profile, self.request_timeout)?
            .parse(text)
            .await
    }
}
