//! Per-socket plain HTTP loop.

use crate::error::http::HttpError;
use crate::http::body::parse_body;
use crate::http::wire::{RequestHead, read_body, read_head, write_continue, write_response};
use crate::http::{Method, Response};
use crate::server::{Shared, channel_task};

use common::HttpStatusCode;

use std::net::SocketAddr;
use std::sync::Arc;

use log::{Level, debug, error, log, warn};
use tokio::net::TcpStream;
use tokio::task::spawn_blocking;

/// Serve requests on `stream` until the peer leaves, asks to close, or upgrades.
pub(crate) async fn serve(shared: Arc<Shared>, mut stream: TcpStream, remote_addr: SocketAddr) {
    let network = &shared.config.network;
    let read_timeout = shared.config.read_timeout();
    let mut buffer = Vec::new();

    loop {
        let head = match read_head(
            &mut stream,
            &mut buffer,
            network.max_header_bytes,
            read_timeout,
        )
        .await
        {
            Ok(Some(head)) => head,
            Ok(None) => {
                debug!("Connection from {} finished", remote_addr);
                return;
            }
            Err(e) => {
                answer_error(&mut stream, remote_addr, &e).await;
                return;
            }
        };

        if head.is_websocket_upgrade() {
            channel_task::run(Arc::clone(&shared), stream, buffer, head, remote_addr).await;
            return;
        }

        match answer(&shared, &mut stream, &mut buffer, head, remote_addr).await {
            Ok(true) => {}
            Ok(false) => return,
            Err(e) => {
                answer_error(&mut stream, remote_addr, &e).await;
                return;
            }
        }
    }
}

/// Read the body, route the request and write the response.
///
/// Returns whether the socket should stay open for another request.
async fn answer(
    shared: &Arc<Shared>,
    stream: &mut TcpStream,
    buffer: &mut Vec<u8>,
    head: RequestHead,
    remote_addr: SocketAddr,
) -> Result<bool, HttpError> {
    let mut request = head.into_request(remote_addr)?;

    if request.headers.contains_token("transfer-encoding", "chunked") {
        return Err(HttpError::malformed(
            "chunked transfer encoding is not supported",
        ));
    }

    let length = request.headers.content_length()?.unwrap_or(0);
    let max_body_bytes = shared.config.network.max_body_bytes;
    if length > 0
        && length <= max_body_bytes
        && request.headers.contains_token("expect", "100-continue")
    {
        write_continue(stream).await?;
    }

    let body = if length > 0 {
        read_body(
            stream,
            buffer,
            length,
            max_body_bytes,
            shared.config.read_timeout(),
        )
        .await?
    } else {
        Vec::new()
    };

    let keep_alive = request.keep_alive();
    let head_only = request.method == Method::Head;
    let method = request.method;
    let path = request.path.clone();

    let routing = Arc::clone(shared);
    let routed = spawn_blocking(move || {
        let upload_dir = routing.config.content.upload_dir.as_deref();
        parse_body(&mut request, &body, upload_dir)?;
        let (response, _) = routing.router.route(&request);
        // Dropping the request removes its temporary upload files.
        Ok::<_, HttpError>(response)
    })
    .await;

    let response = match routed {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => return Err(e),
        Err(join_error) => {
            error!(
                "Request handler for {} {} panicked: {}",
                method, path, join_error
            );
            Response::text(
                HttpStatusCode::INTERNAL_ERROR,
                "SERVER INTERNAL ERROR: request handler failed",
            )
        }
    };

    let level = if response.status.is_server_error() {
        Level::Warn
    } else {
        Level::Info
    };
    log!(
        level,
        "{} \"{} {}\" {} {}",
        remote_addr,
        method,
        path,
        response.status.0,
        response.content_length()
    );

    if let Err(e) = write_response(stream, response, keep_alive, head_only).await {
        debug!("Failed to write response to {}: {}", remote_addr, e);
        return Ok(false);
    }
    Ok(keep_alive)
}

/// Answer a request that failed before routing, then give up on the socket.
async fn answer_error(stream: &mut TcpStream, remote_addr: SocketAddr, failure: &HttpError) {
    if failure.is_protocol_error() {
        warn!("Bad request from {}: {}", remote_addr, failure);
    } else {
        error!("Request from {} failed: {}", remote_addr, failure);
    }

    let response = Response::text(failure.status(), failure.response_text());
    if let Err(e) = write_response(stream, response, false, false).await {
        debug!("Could not report failure to {}: {}", remote_addr, e);
    }
}

