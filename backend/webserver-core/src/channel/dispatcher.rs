//! Routing of inbound envelopes through the message-handler chain.

use crate::channel::connection::Connection;
use crate::channel::envelope::Envelope;
use crate::error::handler::HandlerError;
use crate::routing::chain::{HandlerChain, HandlerId};

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, PoisonError, RwLock};

use log::{debug, error, warn};
use serde_json::Value;

/// Capability: "can consume a message".
///
/// `Ok(true)` consumes the envelope and stops the chain; `Ok(false)` passes it
/// on. `Err` is logged and treated like `Ok(false)`.
pub trait MessageHandler: Send + Sync {
    fn handle(
        &self,
        connection: &Connection,
        address: &str,
        payload: &Value,
    ) -> Result<bool, HandlerError>;
}

impl<F> MessageHandler for F
where
    F: Fn(&Connection, &str, &Value) -> Result<bool, HandlerError> + Send + Sync,
{
    fn handle(
        &self,
        connection: &Connection,
        address: &str,
        payload: &Value,
    ) -> Result<bool, HandlerError> {
        self(connection, address, payload)
    }
}

/// What happened to one inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Consumed by the handler at this position.
    Consumed { index: usize },
    /// Every handler passed (or failed); the frame is dropped.
    Unclaimed,
    /// Not a valid envelope; the frame is dropped.
    Malformed,
}

pub struct MessageDispatcher {
    handlers: RwLock<HandlerChain<dyn MessageHandler>>,
}

impl MessageDispatcher {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HandlerChain::new()),
        }
    }

    pub fn add(&self, handler: Arc<dyn MessageHandler>) -> HandlerId {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handler)
    }

    pub fn add_fn<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&Connection, &str, &Value) -> Result<bool, HandlerError> + Send + Sync + 'static,
    {
        self.add(Arc::new(handler))
    }

    pub fn remove(&self, id: HandlerId) -> bool {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
    }

    pub fn len(&self) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decode `text` and offer it to each handler in order.
    pub fn dispatch(&self, connection: &Connection, text: &str) -> DispatchOutcome {
        match Envelope::parse(text) {
            Ok(envelope) => self.dispatch_envelope(connection, &envelope),
            Err(e) => {
                warn!(
                    "Malformed message from {} dropped: {} (frame: {})",
                    connection.remote_addr(),
                    e,
                    text
                );
                DispatchOutcome::Malformed
            }
        }
    }

    pub fn dispatch_envelope(&self, connection: &Connection, envelope: &Envelope) -> DispatchOutcome {
        let handlers = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot();

        for (index, handler) in handlers.iter().enumerate() {
            let attempt = catch_unwind(AssertUnwindSafe(|| {
                handler.handle(connection, &envelope.address, &envelope.payload)
            }));

            match attempt {
                Ok(Ok(true)) => {
                    debug!(
                        "Message {} from {} consumed by handler {}",
                        envelope.address,
                        connection.id(),
                        index
                    );
                    return DispatchOutcome::Consumed { index };
                }
                Ok(Ok(false)) => {}
                Ok(Err(e)) => {
                    error!(
                        "Message handler {} failed on {}: {} (payload: {})",
                        index, envelope.address, e, envelope.payload
                    );
                }
                Err(panic) => {
                    error!(
                        "Message handler {} panicked on {}: {} (payload: {})",
                        index,
                        envelope.address,
                        panic_message(panic.as_ref()),
                        envelope.payload
                    );
                }
            }
        }

        debug!(
            "Message {} from {} not consumed by any of {} handlers",
            envelope.address,
            connection.id(),
            handlers.len()
        );
        DispatchOutcome::Unclaimed
    }
}

impl Default for MessageDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
