use std::env;

use crate::error::JmsError;

pub const DEFAULT_QUEUE: &str = "DEV.QUEUE.1";
pub const DEFAULT_TYPE_ID_PROPERTY: &str = "_type";
pub const DEFAULT_REJECT_RECIPIENT: &str = "info@example.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub queue: String,
    pub store_path: String,
    pub max_deliveries: u32,
    pub type_id_property: String,
    pub reject_recipient: String,
    pub ack_on_error: bool,
    pub http_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            queue: DEFAULT_QUEUE.to_owned(),
            store_path: ":memory:".to_owned(),
            max_deliveries: 5,
            type_id_property: DEFAULT_TYPE_ID_PROPERTY.to_owned(),
            reject_recipient: DEFAULT_REJECT_RECIPIENT.to_owned(),
            ack_on_error: true,
            http_addr: "localhost:4000".to_owned(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, JmsError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, JmsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let max_deliveries = match lookup("MQ_MAX_DELIVERIES") {
            Some(raw) => raw
                .parse::<u32>()
                .map_err(|e| JmsError::Config(format!("MQ_MAX_DELIVERIES: {}", e)))?,
            None => defaults.max_deliveries,
        };
        if max_deliveries == 0 {
            return Err(JmsError::Config(
                "MQ_MAX_DELIVERIES: must be at least 1".to_owned(),
            ));
        }
        let ack_on_error = match lookup("MQ_ACK_ON_ERROR") {
            Some(raw) => parse_bool(&raw)
                .ok_or_else(|| JmsError::Config(format!("MQ_ACK_ON_ERROR: not a boolean: {}", raw)))?,
            None => defaults.ack_on_error,
        };
        Ok(Self {
            queue: lookup("MQ_QUEUE").unwrap_or(defaults.queue),
            store_path: lookup("MQ_STORE_PATH").unwrap_or(defaults.store_path),
            max_deliveries,
            type_id_property: lookup("MQ_TYPE_ID_PROPERTY").unwrap_or(defaults.type_id_property),
            reject_recipient: lookup("MQ_REJECT_RECIPIENT").unwrap_or(defaults.reject_recipient),
            ack_on_error,
            http_addr: lookup("MQ_HTTP_ADDR").unwrap_or(defaults.http_addr),
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.queue, "DEV.QUEUE.1");
        assert_eq!(config.type_id_property, "_type");
    }

    #[test]
    fn overrides_are_read() {
        let config = Config::from_lookup(lookup(&[
            ("MQ_QUEUE", "DEV.QUEUE.2"),
            ("MQ_MAX_DELIVERIES", "3"),
            ("MQ_ACK_ON_ERROR", "no"),
        ]))
        .unwrap();
        assert_eq!(config.queue, "DEV.QUEUE.2");
        assert_eq!(config.max_deliveries, 3);
        assert!(!config.ack_on_error);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            Config::from_lookup(lookup(&[("MQ_MAX_DELIVERIES", "0")])),
            Err(JmsError::Config(_))
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[("MQ_MAX_DELIVERIES", "many")])),
            Err(JmsError::Config(_))
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[("MQ_ACK_ON_ERROR", "maybe")])),
            Err(JmsError::Config(_))
        ));
    }
}
