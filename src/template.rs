use actix::Addr;
use serde::Serialize;

use crate::broker::{Broker, Publish};
use crate::converter::JsonMessageConverter;
use crate::error::JmsError;
use crate::types::{MessageId, TypeId};

/// Producer side: converts records and publishes them to the broker.
#[derive(Clone)]
pub struct MessageTemplate {
    broker: Addr<Broker>,
    converter: JsonMessageConverter,
}

impl MessageTemplate {
    pub fn new(broker: Addr<Broker>, converter: JsonMessageConverter) -> MessageTemplate {
        MessageTemplate { broker, converter }
    }

    pub async fn convert_and_send<T: Serialize + TypeId>(
        &self,
        destination: &str,
        value: &T,
    ) -> Result<MessageId, JmsError> {
        let text = self.converter.to_text(value)?;
        let id = self
            .broker
            .send(Publish {
                destination: destination.to_owned(),
                text,
            })
            .await??;
        log::debug!("sent {} message {} to {}", T::TYPE_ID, id, destination);
        Ok(id)
    }
}
