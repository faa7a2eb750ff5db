use thiserror::Error;

use crate::types::TextMessage;

#[derive(Debug, Error)]
pub enum JmsError {
    #[error("Failed to convert message: {0}")]
    Conversion(String),

    #[error("Failed to process JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to access queue store: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("Failed to reach broker: {0}")]
    Mailbox(#[from] actix::MailboxError),

    #[error("Broker did not accept message: {0}")]
    Send(String),

    #[error("Destination {0} already has a consumer")]
    AlreadySubscribed(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Raised from a listener and observed by the container's error handler.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("{reason}")]
    Message {
        message: TextMessage,
        reason: String,
    },

    #[error(transparent)]
    Jms(#[from] JmsError),
}

impl ListenerError {
    pub fn message(message: &TextMessage, reason: impl Into<String>) -> ListenerError {
        ListenerError::Message {
            message: message.clone(),
            reason: reason.into(),
        }
    }

    /// The transport message the error was raised for, if it carries one.
    pub fn jms_message(&self) -> Option<&TextMessage> {
        match self {
            ListenerError::Message { message, .. } => Some(message),
            ListenerError::Jms(_) => None,
        }
    }
}
