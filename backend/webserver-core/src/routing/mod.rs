//! Ordered handler chains and the plain-request router built on them.

pub mod chain;
pub mod router;

pub use chain::{HandlerChain, HandlerId};
pub use router::{FAVICON_PATH, RequestHandler, RequestRouter, RouteOutcome};
