use futures::FutureExt;

use super::transport::{AssistantReply, AssistantTransport, BoxFuture, Liveness};

pub const KEYWORD_TRANSPORT_ID: &str = "keyword";
pub const DEFAULT_KEYWORD_REPLY: &str = "Thanks for your message! I'll get back to you soon.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordRule {
    pub keyword: String,
    pub reply: String,
}

impl KeywordRule {
    pub fn new(keyword: impl Into<String>, reply: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into().trim().to_lowercase(),
            reply: reply.into(),
        }
    }
}

/// Offline responder that answers from an ordered keyword table.
///
/// Matching is a case-insensitive substring test and the first rule in table order
/// wins, so broader keywords placed early shadow later ones.
#[derive(Debug, Clone)]
pub struct KeywordTransport {
    rules: Vec<KeywordRule>,
    default_reply: String,
}

impl KeywordTransport {
    pub fn new(rules: Vec<KeywordRule>, default_reply: impl Into<String>) -> Self {
        Self {
            rules: rules
                .into_iter()
                .filter(|rule| !rule.keyword.is_empty())
                .collect(),
            default_reply: default_reply.into(),
        }
    }

    pub fn with_default_rules(contact: &str) -> Self {
        Self::new(default_rules(contact), DEFAULT_KEYWORD_REPLY)
    }

    pub fn rules(&self) -> &[KeywordRule] {
        &self.rules
    }

    pub fn reply_for(&self, text: &str) -> &str {
        let lowercase = text.to_lowercase();
        self.rules
            .iter()
            .find(|rule| lowercase.contains(rule.keyword.as_str()))
            .map(|rule| rule.reply.as_str())
            .unwrap_or(self.default_reply.as_str())
    }
}

impl AssistantTransport for KeywordTransport {
    fn id(&self) -> &str {
        KEYWORD_TRANSPORT_ID
    }

    fn name(&self) -> &str {
        "Keyword responder"
    }

    fn probe_liveness<'a>(&'a self) -> BoxFuture<'a, Liveness> {
        futures::future::ready(Liveness::Connected).boxed()
    }

    fn exchange<'a>(&'a self, text: &'a str) -> BoxFuture<'a, AssistantReply> {
        futures::future::ready(AssistantReply::service(self.reply_for(text))).boxed()
    }
}

fn default_rules(contact: &str) -> Vec<KeywordRule> {
    vec![
        KeywordRule::new(
            "project",
            "There are quite a few projects to explore! You can check them out in the Projects section. \
             Is there a specific area you're interested in?",
        ),
        KeywordRule::new(
            "contact",
            format!("You can get in touch via {contact}!"),
        ),
        KeywordRule::new(
            "resume",
            "The resume can be downloaded from the About section. Would you like a direct link?",
        ),
        KeywordRule::new("hi", "Hello! How can I assist you today?"),
        KeywordRule::new(
            "hello",
            "Hi there! Feel free to ask anything about the work or experience shown here!",
        ),
        KeywordRule::new(
            "experience",
            "The experience covers data science, machine learning, and analytics. \
             What would you like to know more about?",
        ),
        KeywordRule::new(
            "skills",
            "Core skills include Python, R, SQL, machine learning, data visualization, and statistical analysis. \
             Do you want more details on any specific skill?",
        ),
        KeywordRule::new(
            "education",
            "Would you like to know more about the educational background?",
        ),
        KeywordRule::new(
            "thanks",
            "You're welcome! Feel free to reach out if you have any other questions!",
        ),
        KeywordRule::new(
            "thank",
            "No problem at all! Let me know if there's anything else you'd like to know.",
        ),
        KeywordRule::new(
            "bye",
            "Thanks for chatting! Feel free to reach out again if you have more questions. Have a great day!",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ReplySource;

    #[test]
    fn first_matching_rule_wins_in_table_order() {
        let transport = KeywordTransport::new(
            vec![
                KeywordRule::new("thank", "short"),
                KeywordRule::new("thanks", "long"),
            ],
            "default",
        );

        assert_eq!(transport.reply_for("Thanks a lot"), "short");
    }

    #[test]
    fn matching_ignores_case_and_falls_back_to_default_reply() {
        let transport = KeywordTransport::with_default_rules("email");

        assert!(transport.reply_for("Show me a PROJECT").contains("Projects section"));
        assert_eq!(transport.reply_for("???"), DEFAULT_KEYWORD_REPLY);
        assert_eq!(transport.reply_for("how to Contact?"), "You can get in touch via email!");
    }

    #[test]
    fn blank_keywords_are_dropped() {
        let transport = KeywordTransport::new(vec![KeywordRule::new("  ", "never")], "default");

        assert!(transport.rules().is_empty());
        assert_eq!(transport.reply_for("anything"), "default");
    }

    #[tokio::test]
    async fn keyword_transport_is_always_live_and_never_falls_back() {
        let transport = KeywordTransport::with_default_rules("email");

        assert_eq!(transport.probe_liveness().await, Liveness::Connected);
        let reply = transport.exchange("bye now").await;
        assert_eq!(reply.source, ReplySource::Service);
        assert!(reply.text.starts_with("Thanks for chatting!"));
    }
}
