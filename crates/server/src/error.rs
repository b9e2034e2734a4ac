//! Error types for the bill server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use billflow_core::BillError;
use billflow_pipeline::PipelineError;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    InvalidBill(#[from] BillError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{message}")]
    Upload { status: StatusCode, message: String },
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::Pipeline(PipelineError::MissingImage) => StatusCode::BAD_REQUEST,
            ServerError::Pipeline(PipelineError::EmptyExtraction) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::Pipeline(PipelineError::Ocr(_)) => StatusCode::BAD_GATEWAY,
            ServerError::InvalidBill(_) | ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Upload { status, .. } => *status,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "{self}");
        }
        (status, Json(ErrorResponse { error: self.to_string() })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use billflow_pipeline::{ServiceKind, StageError};

    #[test]
    fn pipeline_errors_map_to_distinct_statuses() {
        assert_eq!(
            ServerError::from(PipelineError::MissingImage).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServerError::from(PipelineError::EmptyExtraction).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ServerError::from(PipelineError::Ocr(StageError::Unavailable(ServiceKind::Ocr))).status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn message_is_passed_through() {
        let err = ServerError::from(PipelineError::Ocr(StageError::Upstream {
            service: ServiceKind::Ocr,
            status: 500,
            body: "boom".into(),
        }));
        assert_eq!(
            err.to_string(),
            "OCR processing failed: OCR service returned error (status 500): boom"
        );
    }
}
