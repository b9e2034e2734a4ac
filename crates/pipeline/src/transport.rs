use std::error::Error as StdError;
use std::time::{Duration, Instant};

use oauth2::basic::BasicClient;
use oauth2::{ClientId, ClientSecret, TokenResponse, TokenUrl};
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time;

use crate::auth::{AuthProfile, ServiceKind};

/// Upper bound on every outbound call. One budget covers token acquisition,
/// the request and reading its body.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Header carrying the static API key.
pub const API_KEY_HEADER: &str = "Choreo-API-Key";

/// Tokens this close to expiry are refreshed before use.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(10);

/// Failure of a single call to an upstream service.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("{} service URL not configured", .0.label())]
    Unavailable(ServiceKind),
    #[error("{} service is misconfigured: {message}", .service.label())]
    Misconfigured { service: ServiceKind, message: String },
    #[error("{} service timed out after {}s", .service.label(), .timeout.as_secs())]
    Timeout { service: ServiceKind, timeout: Duration },
    #[error("{} service error: {source}", .service.label())]
    Transport {
        service: ServiceKind,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to obtain access token for {} service: {message}", .service.label())]
    Token { service: ServiceKind, message: String },
    #[error("{} service returned error (status {status}): {body}", .service.label())]
    Upstream { service: ServiceKind, status: u16, body: String },
    #[error("failed to parse {} response: {message}", .service.label())]
    Decode { service: ServiceKind, message: String },
}

impl StageError {
    pub fn service(&self) -> ServiceKind {
        match self {
            StageError::Unavailable(service) => *service,
            StageError::Misconfigured { service, .. }
            | StageError::Timeout { service, .. }
            | StageError::Transport { service, .. }
            | StageError::Token { service, .. }
            | StageError::Upstream { service, .. }
            | StageError::Decode { service, .. } => *service,
        }
    }
}

/// Join `base` and `resource` with exactly one `/`.
pub fn endpoint_url(base: &str, resource: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        resource.trim_start_matches('/')
    )
}

/// Resolve the full resource URL for `service`, failing fast when no base URL is set.
pub fn require_endpoint(
    service: ServiceKind,
    profile: &AuthProfile,
    resource: &str,
) -> Result<String, StageError> {
    if !profile.is_reachable() {
        return Err(StageError::Unavailable(service));
    }
    Ok(endpoint_url(&profile.service_url, resource))
}

// ── Request decorators ────────────────────────────────────────────────────────

/// OAuth2 client-credentials grant. The token is cached for the lifetime of
/// the transport and refreshed when it nears expiry.
struct BearerAuth {
    client_id: ClientId,
    client_secret: ClientSecret,
    token_url: TokenUrl,
    http: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

struct CachedToken {
    secret: String,
    expires_at: Option<Instant>,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        self.expires_at
            .map_or(true, |at| Instant::now() + TOKEN_EXPIRY_MARGIN < at)
    }
}

impl BearerAuth {
    fn new(service: ServiceKind, profile: &AuthProfile) -> Result<Self, StageError> {
        let token_url = TokenUrl::new(profile.token_url.clone()).map_err(|e| {
            StageError::Misconfigured { service, message: format!("invalid token URL: {e}") }
        })?;
        // The token endpoint must not be allowed to redirect credentials elsewhere.
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|source| StageError::Transport { service, source })?;
        Ok(Self {
            client_id: ClientId::new(profile.client_id.clone()),
            client_secret: ClientSecret::new(profile.client_secret.clone()),
            token_url,
            http,
            cached: Mutex::new(None),
        })
    }

    async fn access_token(&self, service: ServiceKind) -> Result<String, StageError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.secret.clone());
        }

        let client = BasicClient::new(self.client_id.clone())
            .set_client_secret(self.client_secret.clone())
            .set_token_uri(self.token_url.clone());
        let response = client
            .exchange_client_credentials()
            .request_async(&self.http)
            .await
            .map_err(|err| StageError::Token { service, message: describe_chain(&err) })?;

        let token = CachedToken {
            secret: response.access_token().secret().clone(),
            expires_at: response.expires_in().map(|ttl| Instant::now() + ttl),
        };
        tracing::debug!(service = %service, expires_in = ?response.expires_in(), "acquired access token");
        let secret = token.secret.clone();
        *cached = Some(token);
        Ok(secret)
    }

    async fn apply(&self, service: ServiceKind, request: RequestBuilder) -> Result<RequestBuilder, StageError> {
        let token = self.access_token(service).await?;
        Ok(request.bearer_auth(token))
    }
}

/// Static API key sent on every request.
struct ApiKeyAuth {
    value: HeaderValue,
}

impl ApiKeyAuth {
    fn new(service: ServiceKind, api_key: &str) -> Result<Self, StageError> {
        let mut value = HeaderValue::from_str(api_key).map_err(|_| StageError::Misconfigured {
            service,
            message: "API key contains characters not allowed in a header".to_string(),
        })?;
        value.set_sensitive(true);
        Ok(Self { value })
    }

    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(API_KEY_HEADER, self.value.clone())
    }
}

// ── Transport ─────────────────────────────────────────────────────────────────

/// HTTP client for one upstream service, authenticated according to its profile.
pub struct AuthenticatedTransport {
    service: ServiceKind,
    http: reqwest::Client,
    timeout: Duration,
    bearer: Option<BearerAuth>,
    api_key: Option<ApiKeyAuth>,
}

impl AuthenticatedTransport {
    pub fn new(service: ServiceKind, profile: &AuthProfile) -> Result<Self, StageError> {
        Self::with_timeout(service, profile, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(
        service: ServiceKind,
        profile: &AuthProfile,
        timeout: Duration,
    ) -> Result<Self, StageError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| StageError::Transport { service, source })?;

        let bearer = profile
            .has_client_credentials()
            .then(|| BearerAuth::new(service, profile))
            .transpose()?;
        let api_key = profile
            .has_api_key()
            .then(|| ApiKeyAuth::new(service, &profile.api_key))
            .transpose()?;

        Ok(Self { service, http, timeout, bearer, api_key })
    }

    pub fn uses_oauth(&self) -> bool {
        self.bearer.is_some()
    }

    pub fn uses_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Start an authenticated POST to `url`. Bearer token first, then API key.
    ///
    /// The timeout budget starts here. Whatever the token fetch leaves of it
    /// becomes the timeout of the returned request.
    pub async fn post(&self, url: &str) -> Result<RequestBuilder, StageError> {
        let deadline = time::Instant::now() + self.timeout;
        let mut request = self.http.post(url).header(ACCEPT, "application/json");
        if let Some(bearer) = &self.bearer {
            request = time::timeout_at(deadline, bearer.apply(self.service, request))
                .await
                .map_err(|_| self.timed_out())??;
        }
        if let Some(api_key) = &self.api_key {
            request = api_key.apply(request);
        }

        let remaining = deadline.saturating_duration_since(time::Instant::now());
        if remaining.is_zero() {
            return Err(self.timed_out());
        }
        Ok(request.timeout(remaining))
    }

    /// Send the request; a non-2xx status becomes [`StageError::Upstream`] with the body verbatim.
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, StageError> {
        let response = request.send().await.map_err(|e| self.request_error(e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StageError::Upstream {
                service: self.service,
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Read the whole body and decode it as JSON.
    pub async fn read_json<T: DeserializeOwned>(&self, response: Response) -> Result<T, StageError> {
        let body = response.bytes().await.map_err(|e| self.request_error(e))?;
        serde_json::from_slice(&body).map_err(|e| StageError::Decode {
            service: self.service,
            message: e.to_string(),
        })
    }

    fn timed_out(&self) -> StageError {
        StageError::Timeout { service: self.service, timeout: self.timeout }
    }

    fn request_error(&self, err: reqwest::Error) -> StageError {
        if err.is_timeout() {
            self.timed_out()
        } else {
            StageError::Transport { service: self.service, source: err }
        }
    }
}

fn describe_chain(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
