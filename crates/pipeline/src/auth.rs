use std::fmt;
use std::str::FromStr;

/// The two upstream dependencies a pipeline run talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    Ocr,
    Parser,
}

impl ServiceKind {
    /// Human-readable name used in error messages.
    pub fn label(self) -> &'static str {
        match self {
            ServiceKind::Ocr => "OCR",
            ServiceKind::Parser => "bill parser",
        }
    }

    /// Prefix of the five environment slots describing this service's connection.
    pub fn env_prefix(self) -> &'static str {
        match self {
            ServiceKind::Ocr => "CHOREO_OCR_SERVICE_CONN_",
            ServiceKind::Parser => "CHOREO_BILL_PARSER_SERVICE_CONN_",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceKind::Ocr => write!(f, "ocr"),
            ServiceKind::Parser => write!(f, "parser"),
        }
    }
}

impl FromStr for ServiceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ocr" => Ok(ServiceKind::Ocr),
            "parser" => Ok(ServiceKind::Parser),
            other => Err(format!("Unknown service: '{other}'")),
        }
    }
}

/// Access configuration for one upstream service. Empty strings mean "not set".
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AuthProfile {
    pub service_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub token_url: String,
    pub api_key: String,
}

impl AuthProfile {
    /// A profile that reaches `service_url` without credentials.
    pub fn anonymous(service_url: impl Into<String>) -> Self {
        Self { service_url: service_url.into(), ..Self::default() }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_client_credentials(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Self {
        self.client_id = client_id.into();
        self.client_secret = client_secret.into();
        self.token_url = token_url.into();
        self
    }

    pub fn is_reachable(&self) -> bool {
        !self.service_url.is_empty()
    }

    /// All three OAuth2 client-credentials settings are present.
    pub fn has_client_credentials(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty() && !self.token_url.is_empty()
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }
}

impl fmt::Debug for AuthProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn redact(value: &str) -> &'static str {
            if value.is_empty() { "" } else { "<redacted>" }
        }
        f.debug_struct("AuthProfile")
            .field("service_url", &self.service_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &redact(&self.client_secret))
            .field("token_url", &self.token_url)
            .field("api_key", &redact(&self.api_key))
            .finish()
    }
}

/// Where a pipeline gets its per-service profiles from. Called once per
/// service per run; implementations must not cache across runs.
pub trait ProfileSource: Send + Sync {
    fn resolve(&self, service: ServiceKind) -> AuthProfile;
}

/// Reads profiles from the process environment on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvProfiles;

impl EnvProfiles {
    /// Resolve by logical name. Unknown names yield an empty profile.
    pub fn resolve_named(&self, name: &str) -> AuthProfile {
        match name.parse::<ServiceKind>() {
            Ok(service) => self.resolve(service),
            Err(_) => AuthProfile::default(),
        }
    }
}

impl ProfileSource for EnvProfiles {
    fn resolve(&self, service: ServiceKind) -> AuthProfile {
        let prefix = service.env_prefix();
        let slot = |suffix: &str| std::env::var(format!("{prefix}{suffix}")).unwrap_or_default();
        AuthProfile {
            service_url: slot("SERVICEURL"),
            client_id: slot("CONSUMERKEY"),
            client_secret: slot("CONSUMERSECRET"),
            token_url: slot("TOKENURL"),
            api_key: slot("APIKEY"),
        }
    }
}

/// Fixed profiles, for tests and embedders that configure services in code.
#[derive(Debug, Clone, Default)]
pub struct StaticProfiles {
    pub ocr: AuthProfile,
    pub parser: AuthProfile,
}

impl StaticProfiles {
    pub fn new(ocr: AuthProfile, parser: AuthProfile) -> Self {
        Self { ocr, parser }
    }
}

impl ProfileSource for StaticProfiles {
    fn resolve(&self, service: ServiceKind) -> AuthProfile {
        match service {
            ServiceKind::Ocr => self.ocr.clone(),
            ServiceKind::Parser => self.parser.clone(),
        }
    }
}
