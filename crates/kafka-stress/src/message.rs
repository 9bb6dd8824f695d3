use std::ops::Deref;
use std::sync::Arc;

use bytes::Bytes;

/// A record addressed to a topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    pub value: Bytes,
}

impl Message {
    pub fn new(topic: impl Into<String>, value: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            value: value.into(),
        }
    }
}

/// Fixed group of identical messages, built once and shared by every producer.
#[derive(Debug, Clone)]
pub struct Batch {
    messages: Arc<[Message]>,
}

impl Batch {
    pub fn repeat(topic: &str, payload: &str, size: usize) -> Self {
        let value = Bytes::copy_from_slice(payload.as_bytes());
        let messages: Vec<Message> = (0..size)
            .map(|_| Message::new(topic, value.clone()))
            .collect();
        Self {
            messages: messages.into(),
        }
    }
}

impl Deref for Batch {
    type Target = [Message];

    fn deref(&self) -> &Self::Target {
        &self.messages
    }
}
