use crate::container::MessageListener;
use crate::converter::JsonMessageConverter;
use crate::error::ListenerError;
use crate::types::{Email, TextMessage};

pub const RECEIVER_ID: &str = "receiver";

pub struct EmailReceiver {
    converter: JsonMessageConverter,
    reject_recipient: String,
}

impl EmailReceiver {
    pub fn new(converter: JsonMessageConverter, reject_recipient: impl Into<String>) -> EmailReceiver {
        EmailReceiver {
            converter,
            reject_recipient: reject_recipient.into(),
        }
    }
}

impl MessageListener for EmailReceiver {
    fn on_message(&mut self, message: &TextMessage) -> Result<(), ListenerError> {
        let email: Email = self.converter.from_message(message)?;
        println!("Received <{}>", email);
        if email.to == self.reject_recipient {
            return Err(ListenerError::message(message, "bad recipient"));
        }
        Ok(())
    }
}
