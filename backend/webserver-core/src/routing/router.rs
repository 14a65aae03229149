//! Plain HTTP request routing.

use crate::http::{Request, Response};
use crate::routing::chain::{HandlerChain, HandlerId, first_match};

use std::sync::{Arc, PoisonError, RwLock};

use log::debug;

/// Browsers probe this path on their own; it never reaches the handlers.
pub const FAVICON_PATH: &str = "/favicon.ico";

/// Capability: "can answer a request".
///
/// Returning `None` means "no opinion" and lets the next handler try.
pub trait RequestHandler: Send + Sync {
    fn handle(&self, request: &Request) -> Option<Response>;
}

impl<F> RequestHandler for F
where
    F: Fn(&Request) -> Option<Response> + Send + Sync,
{
    fn handle(&self, request: &Request) -> Option<Response> {
        self(request)
    }
}

/// How a request was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Answered by the handler at this position in the chain.
    Handled { index: usize },
    /// Favicon probe short-circuited before the chain.
    Favicon,
    /// Every handler declined.
    NotFound,
}

/// Ordered chain of [`RequestHandler`]s with a fixed not-found fallback.
pub struct RequestRouter {
    handlers: RwLock<HandlerChain<dyn RequestHandler>>,
}

impl RequestRouter {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HandlerChain::new()),
        }
    }

    pub fn add(&self, handler: Arc<dyn RequestHandler>) -> HandlerId {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handler)
    }

    pub fn add_fn<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&Request) -> Option<Response> + Send + Sync + 'static,
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

    /// Answer `request` with the first handler response, else not-found.
    pub fn route(&self, request: &Request) -> (Response, RouteOutcome) {
        if request.path == FAVICON_PATH {
            return (Response::favicon_not_found(), RouteOutcome::Favicon);
        }

        let handlers = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot();

        match first_match(&handlers, |_, handler| handler.handle(request)) {
            Some((index, response)) => {
                debug!(
                    "{} {} answered by handler {} with {}",
                    request.method, request.path, index, response.status
                );
                (response, RouteOutcome::Handled { index })
            }
            None => {
                debug!("{} {} matched no handler", request.method, request.path);
                (Response::not_found(), RouteOutcome::NotFound)
            }
        }
    }
}

impl Default for RequestRouter {
    fn default() -> Self {
        Self::new()
    }
}
