use crate::error::HttpError;
use crate::http::{Method, QUERY_STRING_PARAMETER, Request};

/// **VALUE**: Verifies query decoding and the reserved raw-query entry.
///
/// **WHY THIS MATTERS**: Handlers read both decoded parameters and the verbatim query
/// string; losing either breaks redirects and signature checks.
///
/// **BUG THIS CATCHES**: Would catch the raw query being decoded, or repeated keys
/// collapsing to a single value.
#[test]
fn given_query_when_request_new_then_parameters_and_raw_query_present() {
    let request = Request::new(Method::Get, "/search?q=a%20b&tag=x&tag=y").expect("valid target");

    assert_eq!(request.path, "/search");
    assert_eq!(request.parameters.first("q"), Some("a b"));
    assert_eq!(
        request.parameters.get("tag"),
        Some(&["x".to_string(), "y".to_string()][..])
    );
    assert_eq!(request.parameters.raw_query(), "q=a%20b&tag=x&tag=y");
    assert_eq!(
        request.parameters.first(QUERY_STRING_PARAMETER),
        Some("q=a%20b&tag=x&tag=y")
    );
}

/// **VALUE**: Verifies the reserved key exists even without a query string.
///
/// **BUG THIS CATCHES**: Would catch handlers seeing `None` and a query-less request
/// being indistinguishable from a broken parse.
#[test]
fn given_no_query_when_request_new_then_raw_query_is_empty() {
    let request = Request::new(Method::Get, "/index.html").expect("valid target");

    assert!(request.parameters.contains(QUERY_STRING_PARAMETER));
    assert_eq!(request.parameters.raw_query(), "");
    assert_eq!(request.parameters.len(), 1);
}

/// **VALUE**: Verifies the path is percent-decoded.
#[test]
fn given_encoded_path_when_request_new_then_path_is_decoded() {
    let request = Request::new(Method::Get, "/my%20docs/a%2Bb.txt").expect("valid target");
    assert_eq!(request.path, "/my docs/a+b.txt");
}

/// **VALUE**: Verifies a path that decodes to invalid UTF-8 is a bad request.
///
/// **BUG THIS CATCHES**: Would catch lossy decoding that maps two different paths onto
/// the same replacement-character path.
#[test]
fn given_invalid_utf8_path_when_request_new_then_malformed() {
    let result = Request::new(Method::Get, "/%FF%FE");
    assert!(matches!(result, Err(HttpError::Malformed { .. })));
}

/// **VALUE**: Verifies header lookup ignores case.
#[test]
fn given_mixed_case_header_when_get_then_found() {
    let request = Request::new(Method::Get, "/")
        .expect("valid target")
        .with_header("Content-Type", "text/plain");

    assert_eq!(request.headers.get("content-type"), Some("text/plain"));
    assert_eq!(request.headers.get("CONTENT-TYPE"), Some("text/plain"));
}

/// **VALUE**: Verifies keep-alive negotiation for HTTP/1.1 and HTTP/1.0.
///
/// **WHY THIS MATTERS**: Closing a socket the client meant to reuse costs a reconnect;
/// keeping one open that the client abandons leaks a task until the read timeout.
#[test]
fn given_connection_headers_when_keep_alive_then_follows_version_defaults() {
    let http11 = Request::new(Method::Get, "/").expect("valid target");
    assert!(http11.keep_alive());

    let closing = Request::new(Method::Get, "/")
        .expect("valid target")
        .with_header("Connection", "close");
    assert!(!closing.keep_alive());

    let mut http10 = Request::new(Method::Get, "/").expect("valid target");
    http10.version = 0;
    assert!(!http10.keep_alive());

    let http10_keep = {
        let mut request = Request::new(Method::Get, "/")
            .expect("valid target")
            .with_header("Connection", "Keep-Alive");
        request.version = 0;
        request
    };
    assert!(http10_keep.keep_alive());
}

/// **VALUE**: Verifies a non-numeric Content-Length is rejected.
#[test]
fn given_bad_content_length_when_content_length_then_malformed() {
    let request = Request::new(Method::Post, "/")
        .expect("valid target")
        .with_header("Content-Length", "ten");

    assert!(matches!(
        request.headers.content_length(),
        Err(HttpError::Malformed { .. })
    ));
}

/// **VALUE**: Verifies method tokens are parsed case-sensitively.
#[test]
fn given_method_tokens_when_parse_then_only_exact_tokens_match() {
    assert_eq!(Method::parse("GET"), Some(Method::Get));
    assert_eq!(Method::parse("PATCH"), Some(Method::Patch));
    assert_eq!(Method::parse("get"), None);
    assert_eq!(Method::parse("BREW"), None);
    assert!(Method::Put.carries_body());
    assert!(!Method::Delete.carries_body());
}
