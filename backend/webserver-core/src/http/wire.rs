//! Reading request heads/bodies off a socket and writing responses back.

use crate::error::http::HttpError;
use crate::http::request::{Headers, Method, QueryParams, Request, split_target};
use crate::http::response::{Body, Response};
use crate::http::UploadedParts;

use common::ErrorLocation;

use std::net::SocketAddr;
use std::panic::Location;
use std::time::{Duration, SystemTime};

use httpdate::fmt_http_date;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::time::timeout;

const MAX_HEADERS: usize = 64;
const READ_CHUNK: usize = 4096;

/// Parsed request line and headers, before any body is read.
#[derive(Debug)]
pub(crate) struct RequestHead {
    pub method: Method,
    pub target: String,
    pub version: u8,
    pub headers: Headers,
}

impl RequestHead {
    /// GET carrying `Upgrade: websocket` and a `Sec-WebSocket-Key`.
    pub fn is_websocket_upgrade(&self) -> bool {
        self.method == Method::Get
            && self.headers.contains_token("upgrade", "websocket")
            && self.headers.get("sec-websocket-key").is_some()
    }

    pub fn into_request(self, remote_addr: SocketAddr) -> Result<Request, HttpError> {
        let (path, raw_query) = split_target(&self.target)?;
        Ok(Request {
            path,
            method: self.method,
            parameters: QueryParams::from_query(raw_query),
            headers: self.headers,
            files: UploadedParts::default(),
            remote_addr: Some(remote_addr),
            version: self.version,
        })
    }
}

/// Read the next request head, leaving any bytes past it in `buffer`.
///
/// Returns `Ok(None)` when the peer closes or stays idle past `read_timeout`
/// before sending the first byte of a new request.
pub(crate) async fn read_head<S>(
    stream: &mut S,
    buffer: &mut Vec<u8>,
    max_header_bytes: usize,
    read_timeout: Duration,
) -> Result<Option<RequestHead>, HttpError>
where
    S: AsyncRead + Unpin,
{
    loop {
        if !buffer.is_empty() {
            if let Some((head, consumed)) = try_parse_head(buffer)? {
                buffer.drain(..consumed);
                return Ok(Some(head));
            }
        }

        if buffer.len() >= max_header_bytes {
            return Err(HttpError::HeaderTooLarge {
                limit: max_header_bytes,
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let mut chunk = [0u8; READ_CHUNK];
        let read = match timeout(read_timeout, stream.read(&mut chunk)).await {
            Ok(result) => result?,
            Err(_) if buffer.is_empty() => return Ok(None),
            Err(_) => {
                return Err(HttpError::Timeout {
                    message: "request head not completed in time".to_string(),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        };

        if read == 0 {
            if buffer.is_empty() {
                return Ok(None);
            }
            return Err(HttpError::malformed("connection closed inside request head"));
        }
        buffer.extend_from_slice(&chunk[..read]);
    }
}

fn try_parse_head(buffer: &[u8]) -> Result<Option<(RequestHead, usize)>, HttpError> {
    let mut header_storage = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut request = httparse::Request::new(&mut header_storage);

    let consumed = match request.parse(buffer) {
        Ok(httparse::Status::Complete(len)) => len,
        Ok(httparse::Status::Partial) => return Ok(None),
        Err(e) => return Err(HttpError::malformed(format!("syntax error: {e}"))),
    };

    let token = request
        .method
        .ok_or_else(|| HttpError::malformed("missing method"))?;
    let method =
        Method::parse(token).ok_or_else(|| HttpError::malformed(format!("unknown method {token}")))?;
    let target = request
        .path
        .ok_or_else(|| HttpError::malformed("missing request target"))?
        .to_string();
    let version = request
        .version
        .ok_or_else(|| HttpError::malformed("missing HTTP version"))?;

    let mut headers = Headers::new();
    for header in request.headers.iter() {
        headers.insert(header.name, String::from_utf8_lossy(header.value).trim());
    }

    Ok(Some((
        RequestHead {
            method,
            target,
            version,
            headers,
        },
        consumed,
    )))
}

/// Read a body of `length` bytes, starting with whatever is already buffered.
pub(crate) async fn read_body<S>(
    stream: &mut S,
    buffer: &mut Vec<u8>,
    length: u64,
    max_body_bytes: u64,
    read_timeout: Duration,
) -> Result<Vec<u8>, HttpError>
where
    S: AsyncRead + Unpin,
{
    if length > max_body_bytes {
        return Err(HttpError::PayloadTooLarge {
            length,
            limit: max_body_bytes,
            location: ErrorLocation::from(Location::caller()),
        });
    }

    let length = length as usize;
    let buffered = buffer.len().min(length);
    let mut body: Vec<u8> = buffer.drain(..buffered).collect();

    if body.len() < length {
        let start = body.len();
        body.resize(length, 0);
        timeout(read_timeout, stream.read_exact(&mut body[start..]))
            .await
            .map_err(|_| HttpError::Timeout {
                message: format!("request body of {length} bytes not received in time"),
                location: ErrorLocation::from(Location::caller()),
            })??;
    }

    Ok(body)
}

/// Write `response`; `head_only` suppresses the body (HEAD requests).
pub(crate) async fn write_response<S>(
    stream: &mut S,
    response: Response,
    keep_alive: bool,
    head_only: bool,
) -> std::io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    let mut head = format!(
        "HTTP/1.1 {} {}\r\n",
        response.status.0,
        response.status.reason_phrase()
    );
    if let Some(mime_type) = &response.mime_type {
        head.push_str(&format!("Content-Type: {mime_type}\r\n"));
    }
    head.push_str(&format!("Date: {}\r\n", fmt_http_date(SystemTime::now())));
    head.push_str(&format!("Content-Length: {}\r\n", response.content_length()));
    head.push_str(if keep_alive {
        "Connection: keep-alive\r\n\r\n"
    } else {
        "Connection: close\r\n\r\n"
    });

    stream.write_all(head.as_bytes()).await?;

    if !head_only {
        match response.body {
            Body::Bytes(bytes) => stream.write_all(&bytes).await?,
            Body::File { file, length } => {
                let file = tokio::fs::File::from_std(file);
                let mut reader = BufReader::new(file).take(length);
                tokio::io::copy(&mut reader, stream).await?;
            }
        }
    }

    stream.flush().await
}

/// Tell a client waiting on `Expect: 100-continue` to send its body.
pub(crate) async fn write_continue<S>(stream: &mut S) -> std::io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    stream.write_all(b"HTTP/1.1 100 Continue\r\n\r\n").await?;
    stream.flush().await
}

/// Answer an upgrade request with `101 Switching Protocols`.
pub(crate) async fn write_switching_protocols<S>(
    stream: &mut S,
    accept_key: &str,
) -> std::io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    let head = format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Accept: {accept_key}\r\n\r\n"
    );
    stream.write_all(head.as_bytes()).await?;
    stream.flush().await
}
