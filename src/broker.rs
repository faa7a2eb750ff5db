use std::collections::HashMap;

use actix::{Actor, Context, Handler, Message, Recipient};

use crate::database::QueueStore;
use crate::error::JmsError;
use crate::types::{MessageId, TextMessage};

/// Suffix of the queue that takes messages over the redelivery limit.
pub const BACKOUT_SUFFIX: &str = ".BACKOUT";

pub fn backout_destination(destination: &str) -> String {
    format!("{}{}", destination, BACKOUT_SUFFIX)
}

/// Handed from the broker to the consumer of a destination.
#[derive(Message, Debug, Clone)]
#[rtype(result = "()")]
pub struct Deliver {
    pub message: TextMessage,
}

#[derive(Message)]
#[rtype(result = "Result<MessageId, JmsError>")]
pub struct Publish {
    pub destination: String,
    pub text: String,
}

#[derive(Message)]
#[rtype(result = "Result<(), JmsError>")]
pub struct Subscribe {
    pub destination: String,
    pub consumer: Recipient<Deliver>,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Unsubscribe {
    pub destination: String,
}

/// Explicit acknowledgement, e.g. from an error handler. Resolves to false
/// when the message was not in flight any more.
#[derive(Message)]
#[rtype(result = "Result<bool, JmsError>")]
pub struct Acknowledge {
    pub id: MessageId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Acknowledge,
    Release,
}

/// Sent by a consumer once it is done with a delivery; frees it for the next one.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Settle {
    pub destination: String,
    pub id: MessageId,
    pub outcome: Outcome,
}

#[derive(Message)]
#[rtype(result = "Result<Vec<TextMessage>, JmsError>")]
pub struct Browse {
    pub destination: String,
}

struct Subscription {
    consumer: Recipient<Deliver>,
    in_flight: Option<MessageId>,
}

pub struct Broker {
    store: QueueStore,
    subscriptions: HashMap<String, Subscription>,
    max_deliveries: u32,
}

impl Broker {
    pub fn new(store: QueueStore, max_deliveries: u32) -> Broker {
        Broker {
            store,
            subscriptions: HashMap::new(),
            max_deliveries: max_deliveries.max(1),
        }
    }

    /// Hands the next pending message to the destination's consumer if it is idle.
    fn dispatch(&mut self, destination: &str) {
        let subscription = match self.subscriptions.get_mut(destination) {
            Some(subscription) if subscription.in_flight.is_none() => subscription,
            _ => return,
        };
        match self.store.next_pending(destination) {
            Ok(Some(message)) => {
                log::debug!("delivering {} to consumer of {}", message.id, destination);
                subscription.in_flight = Some(message.id);
                let id = message.id;
                if let Err(err) = subscription.consumer.try_send(Deliver { message }) {
                    log::error!("consumer of {} is gone: {}", destination, err);
                    self.subscriptions.remove(destination);
                    if let Err(err) = self.store.requeue(id) {
                        log::error!("failed to requeue message {}: {}", id, err);
                    }
                }
            }
            Ok(None) => {}
            Err(err) => log::error!("failed to read queue {}: {}", destination, err),
        }
    }

    fn release(&mut self, destination: &str, id: MessageId) {
        let delivery_count = match self.store.release(id) {
            Ok(Some(delivery_count)) => delivery_count,
            Ok(None) => return,
            Err(err) => {
                log::error!("failed to release message {}: {}", id, err);
                return;
            }
        };
        if delivery_count < self.max_deliveries {
            return;
        }
        let backout = backout_destination(destination);
        log::warn!(
            "message {} was delivered {} times, moving it to {}",
            id,
            delivery_count,
            backout
        );
        if let Err(err) = self.store.move_to(id, &backout) {
            log::error!("failed to move message {} to {}: {}", id, backout, err);
        }
    }

    fn settle(&mut self, destination: &str, id: MessageId) {
        if let Some(subscription) = self.subscriptions.get_mut(destination) {
            if subscription.in_flight == Some(id) {
                subscription.in_flight = None;
            }
        }
    }
}

impl Actor for Broker {
    type Context = Context<Broker>;
}

impl Handler<Publish> for Broker {
    type Result = Result<MessageId, JmsError>;
    fn handle(&mut self, msg: Publish, _ctx: &mut Self::Context) -> Self::Result {
        let id = self.store.enqueue(&msg.destination, &msg.text)?;
        log::debug!("queued message {} on {}", id, msg.destination);
        self.dispatch(&msg.destination);
        Ok(id)
    }
}

impl Handler<Subscribe> for Broker {
    type Result = Result<(), JmsError>;
    fn handle(&mut self, msg: Subscribe, _ctx: &mut Self::Context) -> Self::Result {
        if self.subscriptions.contains_key(&msg.destination) {
            return Err(JmsError::AlreadySubscribed(msg.destination));
        }
        log::info!("consumer subscribed to {}", msg.destination);
        self.subscriptions.insert(
            msg.destination.clone(),
            Subscription {
                consumer: msg.consumer,
                in_flight: None,
            },
        );
        self.dispatch(&msg.destination);
        Ok(())
    }
}

impl Handler<Unsubscribe> for Broker {
    type Result = ();
    fn handle(&mut self, msg: Unsubscribe, _ctx: &mut Self::Context) -> Self::Result {
        let in_flight = self
            .subscriptions
            .get(&msg.destination)
            .and_then(|subscription| subscription.in_flight);
        if let Some(id) = in_flight {
            self.release(&msg.destination, id);
        }
        if self.subscriptions.remove(&msg.destination).is_some() {
            log::info!("consumer unsubscribed from {}", msg.destination);
        }
    }
}

impl Handler<Acknowledge> for Broker {
    type Result = Result<bool, JmsError>;
    fn handle(&mut self, msg: Acknowledge, _ctx: &mut Self::Context) -> Self::Result {
        Ok(self.store.acknowledge(msg.id)?)
    }
}

impl Handler<Settle> for Broker {
    type Result = ();
    fn handle(&mut self, msg: Settle, _ctx: &mut Self::Context) -> Self::Result {
        match msg.outcome {
            Outcome::Acknowledge => {
                if let Err(err) = self.store.acknowledge(msg.id) {
                    log::error!("failed to acknowledge message {}: {}", msg.id, err);
                }
            }
            Outcome::Release => self.release(&msg.destination, msg.id),
        }
        self.settle(&msg.destination, msg.id);
        self.dispatch(&msg.destination);
    }
}

impl Handler<Browse> for Broker {
    type Result = Result<Vec<TextMessage>, JmsError>;
    fn handle(&mut self, msg: Browse, _ctx: &mut Self::Context) -> Self::Result {
        Ok(self.store.browse(&msg.destination)?)
    }
}
