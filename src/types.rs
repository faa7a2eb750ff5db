use std::fmt;

use serde::{Deserialize, Serialize};

pub type MessageId = i64;

/// Implemented by records the converter can put on a queue.
pub trait TypeId {
    const TYPE_ID: &'static str;
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub body: String,
}

impl Email {
    pub fn new(to: impl Into<String>, body: impl Into<String>) -> Email {
        Email {
            to: to.into(),
            body: body.into(),
        }
    }
}

impl TypeId for Email {
    const TYPE_ID: &'static str = "Email";
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Email{{to='{}', body='{}'}}", self.to, self.body)
    }
}

/// A message as held by the broker and handed to listeners.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TextMessage {
    pub id: MessageId,
    pub destination: String,
    pub text: String,
    pub delivery_count: u32,
    pub redelivered: bool,
}

impl fmt::Display for TextMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TextMessage[id={}, destination={}, deliveries={}, redelivered={}]: {}",
            self.id, self.destination, self.delivery_count, self.redelivered, self.text
        )
    }
}
