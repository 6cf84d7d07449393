use std::sync::Arc;

mod http;
mod keyword;
mod transport;

pub use http::{HTTP_TRANSPORT_ID, HttpTransport};
pub use keyword::{DEFAULT_KEYWORD_REPLY, KEYWORD_TRANSPORT_ID, KeywordRule, KeywordTransport};
pub use transport::{
    AssistantReply, AssistantTransport, BoxFuture, DEFAULT_BASE_URL, DEFAULT_FALLBACK_CONTACT,
    DEFAULT_PROBE_TIMEOUT, DEFAULT_REQUEST_TIMEOUT, Liveness, ReplySource, TransportConfig,
    TransportError, TransportMode, TransportResult, fallback_text,
};

pub fn create_transport(config: TransportConfig) -> TransportResult<Arc<dyn AssistantTransport>> {
    match config.mode {
        TransportMode::Http => Ok(Arc::new(HttpTransport::new(config)?)),
        TransportMode::Keyword => Ok(Arc::new(KeywordTransport::with_default_rules(
            &config.fallback_contact,
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_is_selected_by_mode() {
        let http = create_transport(TransportConfig::default()).expect("default config is valid");
        assert_eq!(http.id(), HTTP_TRANSPORT_ID);

        let keyword = create_transport(TransportConfig::new(TransportMode::Keyword, ""))
            .expect("keyword mode needs no address");
        assert_eq!(keyword.id(), KEYWORD_TRANSPORT_ID);
    }

    #[test]
    fn blank_base_url_uses_local_default() {
        let config = TransportConfig::new(TransportMode::Http, "   ");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);

        let config = TransportConfig::new(TransportMode::Http, "https://assistant.example.com//");
        assert_eq!(config.base_url, "https://assistant.example.com");
    }

    #[test]
    fn fallback_text_names_the_contact_channel() {
        let config = TransportConfig::default().with_fallback_contact("hello@example.com");
        assert!(config.fallback_text().contains("hello@example.com"));
        assert!(!config.fallback_text().contains("error"));
    }
}
