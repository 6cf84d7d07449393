use lumen_transport::AssistantReply;

use crate::chat::message::MessageId;

/// Emitted when the visitor submits the input field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submit {
    pub content: String,
}

impl Submit {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    /// Blank submissions are dropped before they reach the timeline.
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// Identifier for one exchange with the assistant.
///
/// Changes on every accepted submit so a settlement can be matched to the composing
/// indicator it should clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExchangeId(pub u64);

impl ExchangeId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Accepted submit waiting for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingExchange {
    pub id: ExchangeId,
    pub user_message_id: MessageId,
    pub text: String,
}

impl PendingExchange {
    pub fn settle(self, reply: AssistantReply) -> ExchangeSettled {
        ExchangeSettled { id: self.id, reply }
    }
}

/// Emitted once the transport and the composing delay have both finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeSettled {
    pub id: ExchangeId,
    pub reply: AssistantReply,
}
