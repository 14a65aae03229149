//! Handle to a started server.

use crate::channel::ConnectionRegistry;

use std::net::SocketAddr;

use log::info;
use tokio::task::JoinHandle;

/// Handle to a running [`WebServer`](crate::WebServer).
///
/// Dropping the handle does **not** stop the server; the accept loop keeps
/// running until [`shutdown`](Self::shutdown) is called or the runtime exits.
///
/// # Examples
///
/// ```no_run
/// use webserver_core::WebServer;
/// use webserver_core::config::ServerConfig;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let server = WebServer::new(ServerConfig::default());
///     let handle = server.start().await?;
///     println!("listening on {}", handle.local_addr());
///     handle.shutdown().await;
///     Ok(())
/// }
/// ```
pub struct WebServerHandle {
    pub(crate) local_addr: SocketAddr,
    pub(crate) accept_task: JoinHandle<()>,
    pub(crate) keepalive_task: JoinHandle<()>,
    pub(crate) registry: ConnectionRegistry,
}

impl WebServerHandle {
    /// Address actually bound; differs from the configured one when port `0` was requested.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_running(&self) -> bool {
        !self.accept_task.is_finished()
    }

    /// Stop accepting, stop probing and close every persistent connection.
    ///
    /// Plain HTTP sessions already in flight finish their current request.
    pub async fn shutdown(self) {
        self.accept_task.abort();
        self.keepalive_task.abort();
        let _ = self.accept_task.await;
        let _ = self.keepalive_task.await;

        let mut closed = 0;
        self.registry.for_each(|connection| {
            if connection.close() {
                closed += 1;
            }
        });
        info!(
            "Server on {} stopped ({} connections closed)",
            self.local_addr, closed
        );
    }
}
