//! JSON text conversion between records and queue payloads.
//!
//! The record's fields and a type id property share one JSON object, so a
//! payload for an [`Email`](crate::types::Email) reads
//! `{"_type":"Email","to":"...","body":"..."}`.
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::config::DEFAULT_TYPE_ID_PROPERTY;
use crate::error::JmsError;
use crate::types::{TextMessage, TypeId};

#[derive(Debug, Clone)]
pub struct JsonMessageConverter {
    type_id_property: String,
}

impl Default for JsonMessageConverter {
    fn default() -> Self {
        Self::new(DEFAULT_TYPE_ID_PROPERTY)
    }
}

impl JsonMessageConverter {
    pub fn new(type_id_property: impl Into<String>) -> JsonMessageConverter {
        JsonMessageConverter {
            type_id_property: type_id_property.into(),
        }
    }

    pub fn type_id_property(&self) -> &str {
        &self.type_id_property
    }

    /// Serializes `value` into the JSON text of a queue payload.
    pub fn to_text<T: Serialize + TypeId>(&self, value: &T) -> Result<String, JmsError> {
        let mut fields = match serde_json::to_value(value)? {
            Value::Object(fields) => fields,
            other => {
                return Err(JmsError::Conversion(format!(
                    "{} does not serialize to a JSON object: {}",
                    T::TYPE_ID,
                    other
                )))
            }
        };
        if fields.contains_key(&self.type_id_property) {
            return Err(JmsError::Conversion(format!(
                "{} already has a field named {}",
                T::TYPE_ID,
                self.type_id_property
            )));
        }
        fields.insert(
            self.type_id_property.clone(),
            Value::String(T::TYPE_ID.to_owned()),
        );
        Ok(serde_json::to_string(&Value::Object(fields))?)
    }

    pub fn from_text<T: DeserializeOwned + TypeId>(&self, text: &str) -> Result<T, JmsError> {
        let mut fields = match serde_json::from_str::<Value>(text)? {
            Value::Object(fields) => fields,
            _ => {
                return Err(JmsError::Conversion(
                    "payload is not a JSON object".to_owned(),
                ))
            }
        };
        match fields.remove(&self.type_id_property) {
            Some(Value::String(type_id)) if type_id == T::TYPE_ID => {}
            Some(Value::String(type_id)) => {
                return Err(JmsError::Conversion(format!(
                    "expected type id {} but payload has {}",
                    T::TYPE_ID,
                    type_id
                )))
            }
            Some(other) => {
                return Err(JmsError::Conversion(format!(
                    "type id property {} is not a string: {}",
                    self.type_id_property, other
                )))
            }
            None => {
                return Err(JmsError::Conversion(format!(
                    "payload has no type id property {}",
                    self.type_id_property
                )))
            }
        }
        Ok(serde_json::from_value(Value::Object(fields))?)
    }

    pub fn from_message<T: DeserializeOwned + TypeId>(
        &self,
        message: &TextMessage,
    ) -> Result<T, JmsError> {
        self.from_text(&message.text)
    }
}
