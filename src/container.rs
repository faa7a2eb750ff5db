use std::sync::Arc;

use actix::{
    Actor, ActorContext, ActorFutureExt, Addr, AsyncContext, Context, ContextFutureSpawner,
    Handler, Message, WrapFuture,
};

use crate::broker::{Broker, Deliver, Outcome, Settle, Subscribe, Unsubscribe};
use crate::error::ListenerError;
use crate::error_handler::{Acknowledger, ErrorHandler};
use crate::types::TextMessage;

/// Application code invoked for every message delivered to a container.
pub trait MessageListener: 'static {
    fn on_message(&mut self, message: &TextMessage) -> Result<(), ListenerError>;
}

/// Stops a container; a message it has not started on goes back to the queue.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Stop;

/// Builds listener containers sharing one broker and one error handler.
#[derive(Clone)]
pub struct ContainerFactory {
    broker: Addr<Broker>,
    error_handler: Arc<dyn ErrorHandler>,
}

impl ContainerFactory {
    pub fn new(broker: Addr<Broker>, error_handler: Arc<dyn ErrorHandler>) -> ContainerFactory {
        ContainerFactory {
            broker,
            error_handler,
        }
    }

    pub fn create_container<L: MessageListener>(
        &self,
        id: impl Into<String>,
        destination: impl Into<String>,
        listener: L,
    ) -> ListenerContainer {
        ListenerContainer {
            id: id.into(),
            destination: destination.into(),
            broker: self.broker.clone(),
            listener: Box::new(listener),
            error_handler: Arc::clone(&self.error_handler),
            subscribed: false,
        }
    }
}

/// Consumes one destination, one message at a time, on behalf of a listener.
pub struct ListenerContainer {
    id: String,
    destination: String,
    broker: Addr<Broker>,
    listener: Box<dyn MessageListener>,
    error_handler: Arc<dyn ErrorHandler>,
    subscribed: bool,
}

impl ListenerContainer {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }
}

impl Actor for ListenerContainer {
    type Context = Context<ListenerContainer>;

    fn started(&mut self, ctx: &mut Self::Context) {
        let subscribe = Subscribe {
            destination: self.destination.clone(),
            consumer: ctx.address().recipient(),
        };
        self.broker
            .send(subscribe)
            .into_actor(self)
            .map(|result, act, ctx| match result {
                Ok(Ok(())) => {
                    act.subscribed = true;
                    log::info!("container {} listening on {}", act.id, act.destination);
                }
                Ok(Err(err)) => {
                    log::error!("container {} could not subscribe: {}", act.id, err);
                    ctx.stop();
                }
                Err(err) => {
                    log::error!("container {} lost the broker: {}", act.id, err);
                    ctx.stop();
                }
            })
            .wait(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        // a rejected subscription must not drop the consumer that owns the destination
        if !self.subscribed {
            return;
        }
        self.broker.do_send(Unsubscribe {
            destination: self.destination.clone(),
        });
    }
}

impl Handler<Stop> for ListenerContainer {
    type Result = ();
    fn handle(&mut self, _msg: Stop, ctx: &mut Self::Context) -> Self::Result {
        log::info!("stopping container {}", self.id);
        ctx.stop();
    }
}

impl Handler<Deliver> for ListenerContainer {
    type Result = ();
    fn handle(&mut self, msg: Deliver, ctx: &mut Self::Context) -> Self::Result {
        let message = msg.message;
        // left in flight; the broker releases it when the unsubscribe lands
        if !ctx.state().alive() {
            log::debug!("container {} is stopping, skipping {}", self.id, message.id);
            return;
        }
        let outcome = match self.listener.on_message(&message) {
            Ok(()) => Outcome::Acknowledge,
            Err(error) => {
                let acknowledger = Acknowledger::new(self.broker.clone());
                self.error_handler.handle_error(&error, &acknowledger);
                Outcome::Release
            }
        };
        self.broker.do_send(Settle {
            destination: message.destination,
            id: message.id,
            outcome,
        });
    }
}
