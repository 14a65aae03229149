//! First-match-wins handler lists.
//!
//! Both request handlers and message handlers live in a [`HandlerChain`]. The
//! chain is consulted in registration order and the first handler that
//! answers ends the search; that precedence is part of the public contract.

use std::sync::Arc;

/// Identifies one registration in a chain, for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

impl std::fmt::Display for HandlerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "handler#{}", self.0)
    }
}

pub struct HandlerChain<H: ?Sized> {
    entries: Vec<(HandlerId, Arc<H>)>,
    next_id: u64,
}

impl<H: ?Sized> HandlerChain<H> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }

    /// Append `handler`; it is consulted after every handler already present.
    pub fn push(&mut self, handler: Arc<H>) -> HandlerId {
        let id = HandlerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, handler));
        id
    }

    /// Remove a registration. Returns `false` if `id` was already gone.
    pub fn remove(&mut self, id: HandlerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    /// Handlers in consultation order.
    ///
    /// Dispatch runs over a snapshot so a handler may register or remove
    /// handlers without deadlocking on the chain's lock.
    pub fn snapshot(&self) -> Vec<Arc<H>> {
        self.entries
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<H: ?Sized> Default for HandlerChain<H> {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `attempt` over `handlers` in order; the first `Some` wins.
///
/// Returns the winning position together with its answer.
pub fn first_match<H, T, F>(handlers: &[Arc<H>], mut attempt: F) -> Option<(usize, T)>
where
    H: ?Sized,
    F: FnMut(usize, &H) -> Option<T>,
{
    handlers
        .iter()
        .enumerate()
        .find_map(|(index, handler)| attempt(index, handler.as_ref()).map(|answer| (index, answer)))
}
