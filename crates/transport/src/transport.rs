use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use snafu::Snafu;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_FALLBACK_CONTACT: &str = "email or LinkedIn";

/// Which adapter answers the widget's messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// Remote assistant service over HTTP.
    #[default]
    Http,
    /// Local keyword responder for offline and demo pages.
    Keyword,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub mode: TransportMode,
    pub base_url: String,
    pub session_id: Option<String>,
    pub request_timeout: Duration,
    pub probe_timeout: Duration,
    pub fallback_contact: String,
}

impl TransportConfig {
    pub fn new(mode: TransportMode, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        Self {
            mode,
            base_url: if base_url.is_empty() {
                DEFAULT_BASE_URL.to_string()
            } else {
                base_url
            },
            session_id: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            fallback_contact: DEFAULT_FALLBACK_CONTACT.to_string(),
        }
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        let session_id = session_id.into().trim().to_string();
        self.session_id = (!session_id.is_empty()).then_some(session_id);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_fallback_contact(mut self, contact: impl Into<String>) -> Self {
        let contact = contact.into().trim().to_string();
        if !contact.is_empty() {
            self.fallback_contact = contact;
        }
        self
    }

    /// Visitor-facing text used whenever a real reply cannot be obtained.
    pub fn fallback_text(&self) -> String {
        fallback_text(&self.fallback_contact)
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::new(TransportMode::default(), DEFAULT_BASE_URL)
    }
}

pub fn fallback_text(contact: &str) -> String {
    format!(
        "I apologize, but I'm having trouble connecting to my knowledge base right now. \
         Please try again in a moment. If this persists, you can always reach out directly via {contact}."
    )
}

/// Result of the one-shot startup probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Liveness {
    Connected,
    Degraded,
}

/// Where the text of an [`AssistantReply`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplySource {
    Service,
    Fallback,
}

/// Settled outcome of one exchange. Failures are already folded into `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantReply {
    pub text: String,
    pub source: ReplySource,
}

impl AssistantReply {
    pub fn service(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: ReplySource::Service,
        }
    }

    pub fn fallback(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: ReplySource::Fallback,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == ReplySource::Fallback
    }
}

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
pub type TransportResult<T> = Result<T, TransportError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TransportError {
    #[snafu(display("assistant base url '{base_url}' is not an http(s) address"))]
    InvalidBaseUrl {
        stage: &'static str,
        base_url: String,
    },
    #[snafu(display("failed to build http client on `{stage}`: {source}"))]
    BuildClient {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("request to {url} failed on `{stage}`: {source}"))]
    Request {
        stage: &'static str,
        url: String,
        source: reqwest::Error,
    },
    #[snafu(display("request to {url} timed out after {timeout:?}"))]
    Timeout {
        stage: &'static str,
        url: String,
        timeout: Duration,
    },
    #[snafu(display("assistant endpoint {url} returned status {status}"))]
    UnexpectedStatus {
        stage: &'static str,
        url: String,
        status: u16,
    },
    #[snafu(display("assistant reply from {url} is malformed: {source}"))]
    MalformedPayload {
        stage: &'static str,
        url: String,
        source: serde_json::Error,
    },
}

/// Capability the conversation controller talks to.
///
/// Implementations never surface an error from `exchange`: every failure resolves
/// to a fallback reply so the caller keeps a single happy-path shape.
pub trait AssistantTransport: Send + Sync {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn probe_liveness<'a>(&'a self) -> BoxFuture<'a, Liveness>;
    fn exchange<'a>(&'a self, text: &'a str) -> BoxFuture<'a, AssistantReply>;
}
