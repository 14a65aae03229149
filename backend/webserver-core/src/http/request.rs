//! Request model handed to request handlers.

use crate::error::http::HttpError;
use crate::http::body::UploadedParts;

use std::collections::HashMap;
use std::fmt::{Display, Formatter, Result as FormatResult};
use std::net::SocketAddr;

use percent_encoding::percent_decode_str;
use url::form_urlencoded;

/// Reserved query-parameter key holding the raw, undecoded query string.
pub const QUERY_STRING_PARAMETER: &str = "QUERY_STRING";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
    Head,
    Options,
    Trace,
    Connect,
    Patch,
}

impl Method {
    /// Parse a request-line method token. Tokens are case-sensitive.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "GET" => Some(Method::Get),
            "PUT" => Some(Method::Put),
            "POST" => Some(Method::Post),
            "DELETE" => Some(Method::Delete),
            "HEAD" => Some(Method::Head),
            "OPTIONS" => Some(Method::Options),
            "TRACE" => Some(Method::Trace),
            "CONNECT" => Some(Method::Connect),
            "PATCH" => Some(Method::Patch),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Trace => "TRACE",
            Method::Connect => "CONNECT",
            Method::Patch => "PATCH",
        }
    }

    /// Only PUT and POST bodies are parsed into uploaded parts.
    pub fn carries_body(&self) -> bool {
        matches!(self, Method::Put | Method::Post)
    }
}

impl Display for Method {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        formatter.write_str(self.as_str())
    }
}

/// Request headers keyed by lower-cased name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(HashMap<String, String>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header; a repeated name keeps the last value.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.0.insert(name.to_ascii_lowercase(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// True if the comma-separated header `name` lists `token` (case-insensitive).
    pub fn contains_token(&self, name: &str, token: &str) -> bool {
        self.get(name).is_some_and(|value| {
            value
                .split(',')
                .any(|part| part.trim().eq_ignore_ascii_case(token))
        })
    }

    pub fn content_length(&self) -> Result<Option<u64>, HttpError> {
        match self.get("content-length") {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| HttpError::malformed(format!("invalid Content-Length {raw:?}"))),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Query and form parameters: name to every value, in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(HashMap<String, Vec<String>>);

impl QueryParams {
    /// Decode `raw_query` and record it verbatim under [`QUERY_STRING_PARAMETER`].
    pub fn from_query(raw_query: &str) -> Self {
        let mut params = Self::default();
        params.extend_from_urlencoded(raw_query.as_bytes());
        params
            .0
            .insert(QUERY_STRING_PARAMETER.to_string(), vec![raw_query.to_string()]);
        params
    }

    /// Merge `application/x-www-form-urlencoded` pairs.
    pub fn extend_from_urlencoded(&mut self, encoded: &[u8]) {
        for (name, value) in form_urlencoded::parse(encoded) {
            self.append(name.into_owned(), value.into_owned());
        }
    }

    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.entry(name.into()).or_default().push(value.into());
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.0.get(name).map(Vec::as_slice)
    }

    pub fn first(&self, name: &str) -> Option<&str> {
        self.get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// The raw query string, empty when the request target had none.
    pub fn raw_query(&self) -> &str {
        self.first(QUERY_STRING_PARAMETER).unwrap_or("")
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A fully read plain HTTP request.
#[derive(Debug)]
pub struct Request {
    /// Percent-decoded path, without the query string.
    pub path: String,
    pub method: Method,
    pub headers: Headers,
    pub parameters: QueryParams,
    pub files: UploadedParts,
    pub remote_addr: Option<SocketAddr>,
    /// HTTP minor version (`1` for HTTP/1.1).
    pub version: u8,
}

impl Request {
    /// Request for `target` (path plus optional `?query`) with no headers or body.
    pub fn new(method: Method, target: &str) -> Result<Self, HttpError> {
        let (path, raw_query) = split_target(target)?;
        Ok(Self {
            path,
            method,
            headers: Headers::new(),
            parameters: QueryParams::from_query(raw_query),
            files: UploadedParts::default(),
            remote_addr: None,
            version: 1,
        })
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Whether the connection should stay open after answering this request.
    pub fn keep_alive(&self) -> bool {
        if self.headers.contains_token("connection", "close") {
            return false;
        }
        self.version >= 1 || self.headers.contains_token("connection", "keep-alive")
    }
}

/// Split a request target into its decoded path and raw query string.
pub(crate) fn split_target(target: &str) -> Result<(String, &str), HttpError> {
    let (raw_path, raw_query) = target.split_once('?').unwrap_or((target, ""));
    let path = percent_decode_str(raw_path)
        .decode_utf8()
        .map_err(|e| HttpError::malformed(format!("path is not valid UTF-8: {e}")))?
        .into_owned();
    Ok((path, raw_query))
}
