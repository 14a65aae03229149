//! The single-port server shell.
//!
//! One listener serves both plain HTTP requests and upgraded persistent
//! connections. Every accepted socket gets its own task: plain requests go
//! through the [`RequestRouter`]; upgrade requests become a [`Connection`]
//! registered in the [`ConnectionRegistry`] and fed to the
//! [`MessageDispatcher`].

pub(crate) mod channel_task;
pub mod events;
pub mod handle;
mod session;

pub use events::ConnectionEvent;
pub use handle::WebServerHandle;

use crate::SERVER_SIGNATURE;
use crate::channel::{
    BroadcastReport, Connection, ConnectionId, ConnectionRegistry, KeepaliveLoop,
    MessageDispatcher, MessageHandler,
};
use crate::config::ServerConfig;
use crate::content::{DocumentRoot, DynamicRoots};
use crate::error::handler::HandlerError;
use crate::error::server::ServerError;
use crate::http::{Request, Response};
use crate::routing::{HandlerId, RequestHandler, RequestRouter};

use common::ErrorLocation;

use std::panic::Location;
use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, info, warn};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 64;

/// State shared by the accept loop and every connection task.
pub(crate) struct Shared {
    pub config: ServerConfig,
    pub router: RequestRouter,
    pub dynamic_roots: Arc<DynamicRoots>,
    pub dispatcher: Arc<MessageDispatcher>,
    pub registry: ConnectionRegistry,
    pub events: broadcast::Sender<ConnectionEvent>,
}

impl Shared {
    pub fn emit(&self, event: ConnectionEvent) {
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }
}

/// Cloneable handle to the server's handler chains and connections.
///
/// Handlers may be registered before or after [`start`](Self::start); a
/// registration is visible to the next request or frame.
#[derive(Clone)]
pub struct WebServer {
    shared: Arc<Shared>,
}

impl WebServer {
    /// Server with the dynamic-root handler first, then one handler per
    /// configured document root.
    pub fn new(config: ServerConfig) -> Self {
        let router = RequestRouter::new();
        let dynamic_roots = Arc::new(DynamicRoots::new());
        router.add(dynamic_roots.clone());

        for root in &config.content.document_roots {
            debug!("Serving document root {}", root.display());
            router.add(Arc::new(DocumentRoot::new(root.clone())));
        }

        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            shared: Arc::new(Shared {
                config,
                router,
                dynamic_roots,
                dispatcher: Arc::new(MessageDispatcher::new()),
                registry: ConnectionRegistry::new(),
                events,
            }),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.shared.config
    }

    // ============================================
    // REQUEST HANDLERS
    // ============================================

    /// Append a request handler; it is consulted after all existing ones.
    pub fn add_request_handler(&self, handler: Arc<dyn RequestHandler>) -> HandlerId {
        self.shared.router.add(handler)
    }

    pub fn add_handler<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&Request) -> Option<Response> + Send + Sync + 'static,
    {
        self.shared.router.add_fn(handler)
    }

    pub fn remove_request_handler(&self, id: HandlerId) -> bool {
        self.shared.router.remove(id)
    }

    /// Serve files from a fixed directory, after every handler already registered.
    pub fn add_document_root(&self, root: impl Into<PathBuf>) -> HandlerId {
        self.shared.router.add(Arc::new(DocumentRoot::new(root)))
    }

    /// Register (or replace) a root whose directory is computed per request.
    pub fn add_dynamic_root<F>(&self, name: impl Into<String>, supplier: F)
    where
        F: Fn() -> PathBuf + Send + Sync + 'static,
    {
        self.shared.dynamic_roots.insert(name, supplier);
    }

    pub fn remove_dynamic_root(&self, name: &str) -> bool {
        self.shared.dynamic_roots.remove(name)
    }

    // ============================================
    // MESSAGE HANDLERS
    // ============================================

    pub fn add_message_handler(&self, handler: Arc<dyn MessageHandler>) -> HandlerId {
        self.shared.dispatcher.add(handler)
    }

    pub fn add_message_fn<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&Connection, &str, &Value) -> Result<bool, HandlerError> + Send + Sync + 'static,
    {
        self.shared.dispatcher.add_fn(handler)
    }

    pub fn remove_message_handler(&self, id: HandlerId) -> bool {
        self.shared.dispatcher.remove(id)
    }

    // ============================================
    // CONNECTIONS
    // ============================================

    /// Send `text` to every open persistent connection.
    pub fn send_to_all(&self, text: &str) -> BroadcastReport {
        self.shared.registry.broadcast(text)
    }

    pub fn connection_count(&self) -> usize {
        self.shared.registry.len()
    }

    pub fn connection(&self, id: ConnectionId) -> Option<Connection> {
        self.shared.registry.get(id)
    }

    pub fn connections(&self) -> Vec<Connection> {
        self.shared.registry.snapshot()
    }

    /// Human-readable summary such as `2 connections from: 127.0.0.1 127.0.0.1`.
    pub fn describe_connections(&self) -> String {
        self.shared.registry.describe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.shared.events.subscribe()
    }

    // ============================================
    // LIFECYCLE
    // ============================================

    /// Bind the configured address and start serving in background tasks.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address cannot be bound (port in
    /// use, missing permission, unknown host).
    pub async fn start(&self) -> Result<WebServerHandle, ServerError> {
        let address = self.shared.config.bind_address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|e| ServerError::Bind {
                address: address.clone(),
                message: e.to_string(),
                location: ErrorLocation::from(Location::caller()),
            })?;
        let local_addr = listener.local_addr()?;

        info!("{} listening on {}", SERVER_SIGNATURE, local_addr);

        let shared = Arc::clone(&self.shared);
        let accept_task = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, remote_addr)) => {
                        debug!("Accepted connection from {}", remote_addr);
                        tokio::spawn(session::serve(Arc::clone(&shared), stream, remote_addr));
                    }
                    Err(e) => warn!("Accept failed: {}", e),
                }
            }
        });

        let keepalive = &self.shared.config.keepalive;
        let keepalive_task = KeepaliveLoop::new(
            self.shared.registry.clone(),
            self.shared.config.keepalive_interval(),
            keepalive.max_missed_probes,
        )
        .spawn();

        Ok(WebServerHandle {
            local_addr,
            accept_task,
            keepalive_task,
            registry: self.shared.registry.clone(),
        })
    }
}
