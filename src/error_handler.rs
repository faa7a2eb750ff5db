use actix::Addr;

use crate::broker::{Acknowledge, Broker};
use crate::error::{JmsError, ListenerError};
use crate::types::TextMessage;

/// Lets an error handler acknowledge the message a listener failed on.
#[derive(Clone)]
pub struct Acknowledger {
    broker: Addr<Broker>,
}

impl Acknowledger {
    pub fn new(broker: Addr<Broker>) -> Acknowledger {
        Acknowledger { broker }
    }

    /// Queued ahead of the container releasing the message, so an acknowledged
    /// message is never redelivered.
    pub fn acknowledge(&self, message: &TextMessage) -> Result<(), JmsError> {
        self.broker
            .try_send(Acknowledge { id: message.id })
            .map_err(|e| JmsError::Send(e.to_string()))
    }
}

/// Called once by a listener container for every failed delivery.
pub trait ErrorHandler: Send + Sync {
    fn handle_error(&self, error: &ListenerError, acknowledger: &Acknowledger);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingErrorHandler;

impl ErrorHandler for LoggingErrorHandler {
    fn handle_error(&self, error: &ListenerError, _acknowledger: &Acknowledger) {
        log::error!("{}: {:?}", error, error);
    }
}

/// Logs the error and acknowledges the message it carries, so a rejected
/// message is not redelivered.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcknowledgingErrorHandler;

impl ErrorHandler for AcknowledgingErrorHandler {
    fn handle_error(&self, error: &ListenerError, acknowledger: &Acknowledger) {
        log::error!("{}: {:?}", error, error);
        if let Some(message) = error.jms_message() {
            match acknowledger.acknowledge(message) {
                Ok(()) => log::info!("acknowledged {}", message),
                Err(err) => log::error!("failed to acknowledge {}: {}", message, err),
            }
        }
    }
}
