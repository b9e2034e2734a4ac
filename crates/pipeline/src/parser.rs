use std::time::Duration;

use serde::Serialize;

use crate::auth::{AuthProfile, ServiceKind};
use crate::transport::{require_endpoint, AuthenticatedTransport, StageError, REQUEST_TIMEOUT};
use crate::types::ParsedFields;

/// Resource path of the bill parsing endpoint, relative to the service URL.
pub const PARSER_RESOURCE: &str = "process_bill";

#[derive(Serialize)]
struct ParseRequest<'a> {
    text: &'a str,
}

/// Client for the remote bill parsing / classification service.
pub struct ParserClient {
    transport: AuthenticatedTransport,
    endpoint: String,
}

impl ParserClient {
    pub fn from_profile(profile: &AuthProfile) -> Result<Self, StageError> {
        Self::with_timeout(profile, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(profile: &AuthProfile, timeout: Duration) -> Result<Self, StageError> {
        let endpoint = require_endpoint(ServiceKind::Parser, profile, PARSER_RESOURCE)?;
        let transport = AuthenticatedTransport::with_timeout(ServiceKind::Parser, profile, timeout)?;
        Ok(Self { transport, endpoint })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send OCR text for parsing. The reply must be a JSON object; its keys are not checked here.
    pub async fn parse(&self, text: &str) -> Result<ParsedFields, StageError> {
        let request = self
            .transport
            .post(&self.endpoint)
            .await?
            .json(&ParseRequest { text });
        let response = self.transport.send(request).await?;
        self.transport.read_json(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{StubUpstream, CLOSED_PORT_URL};
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    #[tokio::test]
    async fn posts_text_as_json_and_returns_open_object() {
        let router = Router::new().route(
            "/process_bill",
            post(|Json(body): Json<Value>| async move {
                Json(json!({
                    "merchant_name": "Walmart",
                    "echo": body["text"],
                    "unexpected": [1, 2, 3]
                }))
            }),
        );
        let stub = StubUpstream::spawn(router).await;
        let client = ParserClient::from_profile(&AuthProfile::anonymous(format!("{}/", stub.base_url))).unwrap();
        assert_eq!(client.endpoint(), format!("{}/process_bill", stub.base_url));

        let fields = client.parse("Walmart $45.67").await.unwrap();
        assert_eq!(fields["merchant_name"], "Walmart");
        assert_eq!(fields["echo"], "Walmart $45.67");
        assert!(fields.contains_key("unexpected"));
    }

    #[tokio::test]
    async fn non_object_reply_is_decode_error() {
        let router = Router::new().route("/process_bill", post(|| async { Json(json!(["Walmart"])) }));
        let stub = StubUpstream::spawn(router).await;
        let client = ParserClient::from_profile(&AuthProfile::anonymous(&stub.base_url)).unwrap();
        let err = client.parse("text").await.unwrap_err();
        assert!(matches!(err, StageError::Decode { service: ServiceKind::Parser, .. }), "{err}");
    }

    #[tokio::test]
    async fn non_success_status_is_upstream_error() {
        let router = Router::new().route(
            "/process_bill",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "model exploded") }),
        );
        let stub = StubUpstream::spawn(router).await;
        let client = ParserClient::from_profile(&AuthProfile::anonymous(&stub.base_url)).unwrap();
        match client.parse("text").await.unwrap_err() {
            StageError::Upstream { status, body, .. } => {
                assert_eq!(status, 500);
                assert_eq!(body, "model exploded");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn connection_failure_is_transport_error() {
        let client = ParserClient::from_profile(&AuthProfile::anonymous(CLOSED_PORT_URL)).unwrap();
        let err = client.parse("text").await.unwrap_err();
        assert!(matches!(err, StageError::Transport { .. }), "{err}");
    }
}
