use super::message::{Message, MessageId, Sender};

/// Append-only, insertion-ordered message history for one widget session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeline {
    messages: Vec<Message>,
    next_message_id: u64,
}

impl Timeline {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            next_message_id: 1,
        }
    }

    /// Appends a message with the next identifier and returns it.
    pub fn append(&mut self, sender: Sender, text: impl Into<String>, read: bool) -> &Message {
        let id = MessageId::new(self.next_message_id);
        self.next_message_id = self.next_message_id.saturating_add(1);
        self.messages.push(Message::new(id, sender, text, read));
        &self.messages[self.messages.len() - 1]
    }

    /// Marks every message read and returns how many flags flipped.
    pub fn mark_all_read(&mut self) -> usize {
        self.messages
            .iter_mut()
            .map(Message::mark_read)
            .filter(|changed| *changed)
            .count()
    }

    pub fn unread_assistant_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|message| message.is_unread_assistant())
            .count()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        // Ids are strictly increasing in storage order.
        self.messages
            .binary_search_by_key(&id, Message::id)
            .ok()
            .map(|index| &self.messages[index])
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_strictly_increasing_in_append_order() {
        let mut timeline = Timeline::new();
        for index in 0..50 {
            let sender = if index % 2 == 0 {
                Sender::User
            } else {
                Sender::Assistant
            };
            timeline.append(sender, format!("message-{index}"), false);
        }

        let ids = timeline.messages().iter().map(Message::id).collect::<Vec<_>>();
        assert_eq!(ids.len(), 50);
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(timeline.messages()[7].text(), "message-7");
        assert_eq!(timeline.get(ids[7]).map(Message::text), Some("message-7"));
    }

    #[test]
    fn unread_count_only_tracks_assistant_messages() {
        let mut timeline = Timeline::new();
        timeline.append(Sender::User, "question", false);
        timeline.append(Sender::Assistant, "answer", false);
        timeline.append(Sender::Assistant, "seen", true);

        assert_eq!(timeline.unread_assistant_count(), 1);
    }

    #[test]
    fn mark_all_read_flips_each_flag_once() {
        let mut timeline = Timeline::new();
        timeline.append(Sender::User, "question", false);
        timeline.append(Sender::Assistant, "answer", false);

        assert_eq!(timeline.mark_all_read(), 2);
        assert_eq!(timeline.mark_all_read(), 0);
        assert!(timeline.messages().iter().all(Message::is_read));
        assert_eq!(timeline.unread_assistant_count(), 0);
    }
}
