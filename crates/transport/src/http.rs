use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use snafu::{ResultExt, ensure};

use super::transport::{
    AssistantReply, AssistantTransport, BoxFuture, BuildClientSnafu, InvalidBaseUrlSnafu,
    Liveness, MalformedPayloadSnafu, RequestSnafu, TimeoutSnafu, TransportConfig, TransportError,
    TransportResult, UnexpectedStatusSnafu,
};

pub const HTTP_TRANSPORT_ID: &str = "http";

const HEALTH_PATH: &str = "/health";
const CHAT_PATH: &str = "/chat";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    response: String,
}

/// Talks to the remote assistant service over `GET /health` and `POST /chat`.
pub struct HttpTransport {
    config: TransportConfig,
    client: reqwest::Client,
    fallback_text: String,
}

impl HttpTransport {
    pub fn new(config: TransportConfig) -> TransportResult<Self> {
        ensure!(
            config.base_url.starts_with("http://") || config.base_url.starts_with("https://"),
            InvalidBaseUrlSnafu {
                stage: "http-transport-new",
                base_url: config.base_url.clone(),
            }
        );

        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(2)
            .build()
            .context(BuildClientSnafu {
                stage: "build-client",
            })?;

        Ok(Self {
            fallback_text: config.fallback_text(),
            config,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    async fn check_health(&self) -> TransportResult<()> {
        let url = self.endpoint(HEALTH_PATH);
        let request = self.client.get(&url);

        bounded("health-request", &url, self.config.probe_timeout, async {
            let response = request.send().await.context(RequestSnafu {
                stage: "send-health-request",
                url: url.clone(),
            })?;
            let status = response.status();
            ensure!(
                status.is_success(),
                UnexpectedStatusSnafu {
                    stage: "health-status",
                    url: url.clone(),
                    status: status.as_u16(),
                }
            );
            Ok::<(), TransportError>(())
        })
        .await
    }

    async fn request_reply(&self, text: &str) -> TransportResult<String> {
        let url = self.endpoint(CHAT_PATH);
        let request = self.client.post(&url).json(&ChatRequest {
            message: text,
            session_id: self.config.session_id.as_deref(),
        });

        let payload = bounded("chat-request", &url, self.config.request_timeout, async {
            let response = request.send().await.context(RequestSnafu {
                stage: "send-chat-request",
                url: url.clone(),
            })?;
            let status = response.status();
            ensure!(
                status.is_success(),
                UnexpectedStatusSnafu {
                    stage: "chat-status",
                    url: url.clone(),
                    status: status.as_u16(),
                }
            );
            response.text().await.context(RequestSnafu {
                stage: "read-chat-response",
                url: url.clone(),
            })
        })
        .await?;

        let reply: ChatResponse =
            serde_json::from_str(&payload).context(MalformedPayloadSnafu {
                stage: "parse-chat-response",
                url,
            })?;
        Ok(reply.response)
    }
}

impl AssistantTransport for HttpTransport {
    fn id(&self) -> &str {
        HTTP_TRANSPORT_ID
    }

    fn name(&self) -> &str {
        "Assistant service"
    }

    fn probe_liveness<'a>(&'a self) -> BoxFuture<'a, Liveness> {
        Box::pin(async move {
            match self.check_health().await {
                Ok(()) => {
                    tracing::info!("assistant service at {} is healthy", self.config.base_url);
                    Liveness::Connected
                }
                Err(error) => {
                    tracing::warn!("assistant liveness probe failed: {}", error);
                    Liveness::Degraded
                }
            }
        })
    }

    fn exchange<'a>(&'a self, text: &'a str) -> BoxFuture<'a, AssistantReply> {
        Box::pin(async move {
            match self.request_reply(text).await {
                Ok(reply) => AssistantReply::service(reply),
                Err(error) => {
                    // The visitor only ever sees the fixed fallback; details stay in the log.
                    tracing::warn!("assistant exchange failed, replying with fallback: {}", error);
                    AssistantReply::fallback(self.fallback_text.clone())
                }
            }
        })
    }
}

async fn bounded<T>(
    stage: &'static str,
    url: &str,
    timeout: Duration,
    operation: impl Future<Output = TransportResult<T>>,
) -> TransportResult<T> {
    match tokio::time::timeout(timeout, operation).await {
        Ok(result) => result,
        Err(_) => TimeoutSnafu {
            stage,
            url: url.to_string(),
            timeout,
        }
        .fail(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{ReplySource, TransportMode};
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport_for(server: &MockServer) -> HttpTransport {
        let config = TransportConfig::new(TransportMode::Http, server.uri())
            .with_request_timeout(Duration::from_millis(300))
            .with_probe_timeout(Duration::from_millis(300));
        HttpTransport::new(config).expect("valid transport config")
    }

    #[tokio::test]
    async fn healthy_service_probes_connected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "healthy"})))
            .expect(1)
            .mount(&server)
            .await;

        let transport = transport_for(&server);
        assert_eq!(transport.probe_liveness().await, Liveness::Connected);
    }

    #[tokio::test]
    async fn unhealthy_status_probes_degraded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let transport = transport_for(&server);
        assert_eq!(transport.probe_liveness().await, Liveness::Degraded);
    }

    #[tokio::test]
    async fn unreachable_service_probes_degraded() {
        let server = MockServer::start().await;
        let config = TransportConfig::new(TransportMode::Http, server.uri())
            .with_probe_timeout(Duration::from_millis(300));
        drop(server);

        let transport = HttpTransport::new(config).expect("valid transport config");
        assert_eq!(transport.probe_liveness().await, Liveness::Degraded);
    }

    #[tokio::test]
    async fn chat_reply_is_used_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .and(body_json(json!({"message": "hello"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"response": "  Hi! Ask me anything.\n", "session_id": "default"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let transport = transport_for(&server);
        let reply = transport.exchange("hello").await;

        assert_eq!(reply.source, ReplySource::Service);
        assert_eq!(reply.text, "  Hi! Ask me anything.\n");
    }

    #[tokio::test]
    async fn configured_session_id_is_sent_with_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .and(body_json(json!({"message": "skills?", "session_id": "visitor-7"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": "Rust."})))
            .expect(1)
            .mount(&server)
            .await;

        let config = TransportConfig::new(TransportMode::Http, format!("{}/", server.uri()))
            .with_session_id("visitor-7");
        let transport = HttpTransport::new(config).expect("valid transport config");

        assert_eq!(transport.exchange("skills?").await.text, "Rust.");
    }

    #[tokio::test]
    async fn server_error_resolves_to_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "boom"})))
            .mount(&server)
            .await;

        let transport = transport_for(&server);
        let reply = transport.exchange("hello").await;

        assert!(reply.is_fallback());
        assert_eq!(reply.text, TransportConfig::default().fallback_text());
    }

    #[tokio::test]
    async fn malformed_and_incomplete_payloads_resolve_to_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"answer": "wrong field"})))
            .mount(&server)
            .await;

        let transport = transport_for(&server);

        assert!(transport.exchange("first").await.is_fallback());
        assert!(transport.exchange("second").await.is_fallback());
    }

    #[tokio::test]
    async fn slow_reply_times_out_into_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"response": "too late"}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let transport = transport_for(&server);
        let reply = transport.exchange("hello").await;

        assert!(reply.is_fallback());
    }

    #[test]
    fn non_http_base_url_is_rejected() {
        let config = TransportConfig::new(TransportMode::Http, "ftp://assistant.local");
        assert!(HttpTransport::new(config).is_err());
    }
}
