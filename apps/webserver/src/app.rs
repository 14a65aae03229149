//! Assembling a configured server and running it until interrupted.

use crate::cli::Cli;
use crate::error::WebserverError;

use webserver_core::channel::Connection;
use webserver_core::config::ServerConfig;
use webserver_core::error::{CoreError, HandlerError};
use webserver_core::{ConnectionEvent, WebServer, WebServerHandle};

use common::ErrorLocation;

use std::panic::Location;

use log::{info, warn};
use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Address answered by the built-in echo handler.
pub const ECHO_ADDRESS: &str = "echo";

/// Resolve the effective config: file, then environment, then flags.
///
/// # Errors
///
/// Returns [`WebserverError::Config`] if the file is invalid, an environment
/// override cannot be parsed, or the final values fail validation.
#[track_caller]
pub fn resolve_config<F>(cli: &Cli, lookup: F) -> Result<ServerConfig, WebserverError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match cli
        .config_dir
        .clone()
        .or_else(ServerConfig::default_config_dir)
    {
        Some(dir) => ServerConfig::load(&dir).map_err(CoreError::from)?,
        None => {
            warn!("No config directory available, using defaults");
            ServerConfig::default()
        }
    };

    config.apply_env_overrides(lookup).map_err(CoreError::from)?;
    cli.apply(&mut config);
    config.validate().map_err(CoreError::from)?;

    Ok(config)
}

/// Server for `config` with the built-in message handlers installed.
pub fn build_server(config: ServerConfig) -> WebServer {
    let server = WebServer::new(config);
    server.add_message_fn(echo);
    server
}

/// Reply to `echo` envelopes with the same envelope.
fn echo(connection: &Connection, address: &str, payload: &Value) -> Result<bool, HandlerError> {
    if address != ECHO_ADDRESS {
        return Ok(false);
    }
    connection.send_envelope(ECHO_ADDRESS, payload.clone())?;
    Ok(true)
}

/// Log every connection change together with the current membership.
pub fn spawn_connection_logger(server: &WebServer) -> JoinHandle<()> {
    let server = server.clone();
    let mut events = server.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(ConnectionEvent::Opened { remote_addr, .. }) => {
                    info!(
                        "Client {} connected; {}",
                        remote_addr,
                        server.describe_connections()
                    );
                }
                Ok(ConnectionEvent::Closed { remote_addr, .. }) => {
                    info!(
                        "Client {} disconnected; {}",
                        remote_addr,
                        server.describe_connections()
                    );
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Connection logger skipped {skipped} events");
                }
                Err(RecvError::Closed) => return,
            }
        }
    })
}

/// Start `server`, mapping bind failures into the app error.
pub async fn start(server: &WebServer) -> Result<WebServerHandle, WebserverError> {
    Ok(server.start().await.map_err(CoreError::from)?)
}

/// Run with the given flags until Ctrl-C.
pub async fn run(cli: Cli) -> Result<(), WebserverError> {
    let config = resolve_config(&cli, |name| std::env::var(name).ok())?;
    for root in &config.content.document_roots {
        if !root.is_dir() {
            warn!("Document root {} is not a directory", root.display());
        }
    }

    let server = build_server(config);
    let connection_logger = spawn_connection_logger(&server);
    let handle = start(&server).await?;
    info!("Serving on http://{}", handle.local_addr());

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| WebserverError::Webserver {
            message: format!("Failed to wait for Ctrl-C: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;

    info!("Shutting down");
    handle.shutdown().await;
    connection_logger.abort();
    Ok(())
}
