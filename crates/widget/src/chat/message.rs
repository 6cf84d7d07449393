use std::time::{SystemTime, UNIX_EPOCH};

/// Stable identifier for one message.
///
/// Identifiers are assigned by the timeline in creation order, so they double as
/// the render and reconciliation key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub u64);

impl MessageId {
    /// Creates a typed message identifier.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sender {
    User,
    Assistant,
}

/// Core message record. Only `read` changes after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    id: MessageId,
    text: String,
    sender: Sender,
    created_at_unix_millis: u64,
    read: bool,
}

impl Message {
    pub(crate) fn new(id: MessageId, sender: Sender, text: impl Into<String>, read: bool) -> Self {
        Self {
            id,
            text: text.into(),
            sender,
            created_at_unix_millis: unix_millis_now(),
            read,
        }
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn sender(&self) -> Sender {
        self.sender
    }

    pub fn created_at_unix_millis(&self) -> u64 {
        self.created_at_unix_millis
    }

    pub fn is_read(&self) -> bool {
        self.read
    }

    pub fn is_unread_assistant(&self) -> bool {
        self.sender == Sender::Assistant && !self.read
    }

    /// Flips the read flag; it never goes back to unread.
    pub(crate) fn mark_read(&mut self) -> bool {
        let changed = !self.read;
        self.read = true;
        changed
    }
}

fn unix_millis_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}
