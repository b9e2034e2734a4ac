pub mod auth;
pub mod parser;
pub mod pipeline;
pub mod reconcile;
pub mod recognizer;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use auth::{AuthProfile, EnvProfiles, ProfileSource, ServiceKind, StaticProfiles};
pub use parser::{ParserClient, PARSER_RESOURCE};
pub use pipeline::{BillPipeline, PipelineError, PipelineStage};
pub use reconcile::FieldReader;
pub use recognizer::{OcrClient, OcrError, OCR_RESOURCE};
pub use transport::{
    endpoint_url, AuthenticatedTransport, StageError, API_KEY_HEADER, REQUEST_TIMEOUT,
};
pub use types::{BillProcessResult, Confidence, ParsedFields, RawImage, DEFAULT_CONTENT_TYPE};
