use crate::helpers::{http_url, start, test_config};

use webserver_core::WebServer;
use webserver_core::http::body::{POST_DATA_PART, PUT_CONTENT_PART};
use webserver_core::http::{QUERY_STRING_PARAMETER, Request, Response};
use webserver_core::routing::RequestHandler;

use common::HttpStatusCode;

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

// ============================================================================
// Static content
// ============================================================================

/// **VALUE**: Verifies a configured document root is served over real HTTP.
///
/// **WHY THIS MATTERS**: Serving a local directory is the reason the server exists.
///
/// **BUG THIS CATCHES**: Would catch:
/// - Document roots from config never being registered
/// - Wrong Content-Length or Content-Type on the wire
/// - File bodies being truncated by the streaming writer
#[tokio::test]
async fn given_document_root_when_file_requested_then_served_with_length_and_type() {
    // GIVEN: A server with one document root containing a stylesheet
    let site = tempfile::tempdir().expect("temp dir");
    fs::write(site.path().join("site.css"), "h1 { margin: 0 }").expect("write");
    let mut config = test_config();
    config.content.document_roots.push(site.path().to_path_buf());
    let server = WebServer::new(config);
    let handle = start(&server).await;

    // WHEN: The file is requested
    let response = reqwest::get(http_url(&handle, "/site.css"))
        .await
        .expect("request");

    // THEN: It comes back whole, typed by extension
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.headers()["content-type"], "text/css");
    assert_eq!(response.headers()["content-length"], "16");
    assert!(response.headers().contains_key("date"));
    assert_eq!(response.text().await.expect("body"), "h1 { margin: 0 }");

    handle.shutdown().await;
}

/// **VALUE**: Verifies the fixed answers for favicon probes and unknown paths.
///
/// **BUG THIS CATCHES**: Would catch the favicon reaching a catch-all handler, or the
/// not-found body changing.
#[tokio::test]
async fn given_no_matching_handler_when_requested_then_not_found_responses() {
    let server = WebServer::new(test_config());
    let handle = start(&server).await;

    let favicon = reqwest::get(http_url(&handle, "/favicon.ico"))
        .await
        .expect("request");
    assert_eq!(favicon.status().as_u16(), 404);
    assert!(favicon.headers().get("content-type").is_none());
    assert_eq!(favicon.text().await.expect("body"), "");

    let missing = reqwest::get(http_url(&handle, "/missing.html"))
        .await
        .expect("request");
    assert_eq!(missing.status().as_u16(), 404);
    assert_eq!(
        missing.text().await.expect("body"),
        "Couldn't understand request"
    );

    handle.shutdown().await;
}

/// **VALUE**: Verifies dynamic roots follow their supplier between requests.
///
/// **WHY THIS MATTERS**: Applications switch the served build directory at runtime
/// and expect the next request to see it.
#[tokio::test]
async fn given_dynamic_root_when_supplier_switches_then_next_request_uses_new_directory() {
    // GIVEN: Two build directories and a dynamic root pointing at the first
    let old_build = tempfile::tempdir().expect("temp dir");
    let new_build = tempfile::tempdir().expect("temp dir");
    fs::write(old_build.path().join("index.html"), "old").expect("write");
    fs::write(new_build.path().join("index.html"), "new").expect("write");

    let current = Arc::new(Mutex::new(old_build.path().to_path_buf()));
    let server = WebServer::new(test_config());
    let supplier = Arc::clone(&current);
    server.add_dynamic_root("build", move || supplier.lock().expect("lock").clone());
    let handle = start(&server).await;

    let first = reqwest::get(http_url(&handle, "/index.html"))
        .await
        .expect("request");
    assert_eq!(first.text().await.expect("body"), "old");

    // WHEN: The supplier switches directory
    *current.lock().expect("lock") = new_build.path().to_path_buf();

    // THEN: The next request is served from the new directory
    let second = reqwest::get(http_url(&handle, "/index.html"))
        .await
        .expect("request");
    assert_eq!(second.text().await.expect("body"), "new");

    // WHEN: The root is removed
    assert!(server.remove_dynamic_root("build"));
    let third = reqwest::get(http_url(&handle, "/index.html"))
        .await
        .expect("request");
    assert_eq!(third.status().as_u16(), 404);

    handle.shutdown().await;
}

/// **VALUE**: Verifies dynamic roots take precedence over configured document roots.
#[tokio::test]
async fn given_same_file_in_dynamic_and_fixed_root_when_requested_then_dynamic_wins() {
    let fixed = tempfile::tempdir().expect("temp dir");
    let dynamic = tempfile::tempdir().expect("temp dir");
    fs::write(fixed.path().join("app.js"), "fixed()").expect("write");
    fs::write(dynamic.path().join("app.js"), "dynamic()").expect("write");

    let mut config = test_config();
    config.content.document_roots.push(fixed.path().to_path_buf());
    let server = WebServer::new(config);
    let dynamic_path = dynamic.path().to_path_buf();
    server.add_dynamic_root("live", move || dynamic_path.clone());
    let handle = start(&server).await;

    let response = reqwest::get(http_url(&handle, "/app.js"))
        .await
        .expect("request");
    assert_eq!(response.text().await.expect("body"), "dynamic()");

    handle.shutdown().await;
}

// ============================================================================
// Request handlers
// ============================================================================

/// **VALUE**: Verifies handlers see the decoded path, parameters and raw query.
#[tokio::test]
async fn given_handler_when_query_sent_then_parameters_visible() {
    let server = WebServer::new(test_config());
    server.add_handler(|request: &Request| {
        (request.path == "/api/echo").then(|| {
            let body = format!(
                "{}|{}|{}",
                request.method,
                request.parameters.first("name").unwrap_or("-"),
                request.parameters.first(QUERY_STRING_PARAMETER).unwrap_or("-")
            );
            Response::text(HttpStatusCode::OK, body)
        })
    });
    let handle = start(&server).await;

    let response = reqwest::get(http_url(&handle, "/api/echo?name=J%C3%BCrgen"))
        .await
        .expect("request");

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.headers()["content-type"], "text/plain");
    assert_eq!(
        response.text().await.expect("body"),
        "GET|Jürgen|name=J%C3%BCrgen"
    );

    handle.shutdown().await;
}

/// **VALUE**: Verifies POST and PUT bodies reach handlers as uploaded parts.
///
/// **BUG THIS CATCHES**: Would catch:
/// - Bodies not being read before routing
/// - PUT content temp files being deleted before the handler runs
#[tokio::test]
async fn given_post_and_put_bodies_when_sent_then_handler_reads_parts() {
    let server = WebServer::new(test_config());
    server.add_handler(|request: &Request| {
        if let Some(data) = request.files.get(POST_DATA_PART) {
            return Some(Response::text(HttpStatusCode::OK, format!("post:{data}")));
        }
        let path = PathBuf::from(request.files.get(PUT_CONTENT_PART)?);
        let contents = fs::read_to_string(path).ok()?;
        Some(Response::text(HttpStatusCode::OK, format!("put:{contents}")))
    });
    let handle = start(&server).await;
    let client = reqwest::Client::new();

    let posted = client
        .post(http_url(&handle, "/data"))
        .header("Content-Type", "application/json")
        .body(r#"{"k":"v"}"#)
        .send()
        .await
        .expect("request");
    assert_eq!(posted.text().await.expect("body"), r#"post:{"k":"v"}"#);

    let put = client
        .put(http_url(&handle, "/doc"))
        .body("document body")
        .send()
        .await
        .expect("request");
    assert_eq!(put.text().await.expect("body"), "put:document body");

    handle.shutdown().await;
}

/// **VALUE**: Verifies a panicking handler produces a 500 and the server keeps serving.
///
/// **WHY THIS MATTERS**: Application handlers are arbitrary code; one bug must not
/// take down the development server.
#[tokio::test]
async fn given_panicking_handler_when_requested_then_500_and_server_survives() {
    let server = WebServer::new(test_config());
    server.add_handler(|request: &Request| {
        if request.path == "/boom" {
            panic!("handler bug");
        }
        Some(Response::text(HttpStatusCode::OK, "fine"))
    });
    let handle = start(&server).await;

    let failed = reqwest::get(http_url(&handle, "/boom"))
        .await
        .expect("request");
    assert_eq!(failed.status().as_u16(), 500);
    assert!(
        failed
            .text()
            .await
            .expect("body")
            .starts_with("SERVER INTERNAL ERROR")
    );

    let ok = reqwest::get(http_url(&handle, "/other"))
        .await
        .expect("request");
    assert_eq!(ok.text().await.expect("body"), "fine");

    handle.shutdown().await;
}

/// **VALUE**: Verifies a removed handler no longer answers.
#[tokio::test]
async fn given_removed_handler_when_requested_then_not_found() {
    let server = WebServer::new(test_config());
    let id = server.add_handler(|_: &Request| Some(Response::text(HttpStatusCode::OK, "x")));
    let handle = start(&server).await;

    assert!(server.remove_request_handler(id));
    let response = reqwest::get(http_url(&handle, "/"))
        .await
        .expect("request");
    assert_eq!(response.status().as_u16(), 404);

    handle.shutdown().await;
}

/// Answers every path under `prefix` with a fixed body.
struct PrefixHandler {
    prefix: &'static str,
    body: &'static str,
}

impl RequestHandler for PrefixHandler {
    fn handle(&self, request: &Request) -> Option<Response> {
        request
            .path
            .starts_with(self.prefix)
            .then(|| Response::text(HttpStatusCode::OK, self.body))
    }
}

/// **VALUE**: Verifies a handler type (not just a closure) can be registered.
///
/// **BUG THIS CATCHES**: Would catch `add_request_handler` dropping the handler or
/// consulting it for paths it declines.
#[tokio::test]
async fn given_struct_handler_when_requested_then_answers_only_its_prefix() {
    // GIVEN: A server with a handler that owns `/api`
    let server = WebServer::new(test_config());
    server.add_request_handler(Arc::new(PrefixHandler {
        prefix: "/api",
        body: "api",
    }));
    let handle = start(&server).await;

    // WHEN: One path inside and one outside the prefix are requested
    let inside = reqwest::get(http_url(&handle, "/api/items"))
        .await
        .expect("request");
    let outside = reqwest::get(http_url(&handle, "/elsewhere"))
        .await
        .expect("request");

    // THEN: Only the prefixed path is answered by the handler
    assert_eq!(inside.status().as_u16(), 200);
    assert_eq!(inside.text().await.expect("body"), "api");
    assert_eq!(outside.status().as_u16(), 404);

    handle.shutdown().await;
}

// ============================================================================
// Wire behaviour
// ============================================================================

async fn raw_exchange(handle: &webserver_core::WebServerHandle, request: &[u8]) -> String {
    let mut stream = TcpStream::connect(handle.local_addr())
        .await
        .expect("connect");
    stream.write_all(request).await.expect("write");
    let mut response = Vec::new();
    crate::helpers::within(stream.read_to_end(&mut response))
        .await
        .expect("read");
    String::from_utf8_lossy(&response).into_owned()
}

/// **VALUE**: Verifies `Expect: 100-continue` is answered before the body is read.
///
/// **WHY THIS MATTERS**: curl and similar clients hold back large uploads until they
/// see the interim response, otherwise stalling on their own timeout.
///
/// **BUG THIS CATCHES**: Would catch the server waiting for a body the client is
/// waiting for permission to send.
#[tokio::test]
async fn given_expect_continue_when_post_sent_then_interim_response_precedes_body() {
    // GIVEN: A handler that echoes the posted body
    let server = WebServer::new(test_config());
    server.add_handler(|request: &Request| {
        let data = request.files.get(POST_DATA_PART)?;
        Some(Response::text(HttpStatusCode::OK, format!("post:{data}")))
    });
    let handle = start(&server).await;
    let mut stream = TcpStream::connect(handle.local_addr())
        .await
        .expect("connect");

    // WHEN: Only the head is sent, announcing a body
    stream
        .write_all(
            b"POST /upload HTTP/1.1\r\nHost: x\r\nContent-Type: text/plain\r\n\
              Content-Length: 5\r\nExpect: 100-continue\r\nConnection: close\r\n\r\n",
        )
        .await
        .expect("write head");

    // THEN: The interim response arrives without the body having been sent
    let interim = b"HTTP/1.1 100 Continue\r\n\r\n";
    let mut received = vec![0u8; interim.len()];
    crate::helpers::within(stream.read_exact(&mut received))
        .await
        .expect("interim response");
    assert_eq!(&received[..], &interim[..]);

    // AND: Sending the body yields the final response
    stream.write_all(b"hello").await.expect("write body");
    let mut response = Vec::new();
    crate::helpers::within(stream.read_to_end(&mut response))
        .await
        .expect("final response");
    let response = String::from_utf8_lossy(&response);
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{response}");
    assert!(response.ends_with("post:hello"), "{response}");

    handle.shutdown().await;
}

/// **VALUE**: Verifies chunked request bodies are refused with 400 and the socket closed.
#[tokio::test]
async fn given_chunked_body_when_sent_then_bad_request() {
    let server = WebServer::new(test_config());
    let handle = start(&server).await;

    let response = raw_exchange(
        &handle,
        b"POST /x HTTP/1.1\r\nHost: t\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n0\r\n\r\n",
    )
    .await;

    assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"), "{response}");
    assert!(response.contains("Connection: close\r\n"));

    handle.shutdown().await;
}

/// **VALUE**: Verifies two requests are answered on one kept-alive socket.
///
/// **BUG THIS CATCHES**: Would catch the session loop closing after every response or
/// losing pipelined bytes between requests.
#[tokio::test]
async fn given_pipelined_requests_when_sent_then_both_answered_in_order() {
    let server = WebServer::new(test_config());
    server.add_handler(|request: &Request| {
        Some(Response::text(HttpStatusCode::OK, request.path.clone()))
    });
    let handle = start(&server).await;

    let response = raw_exchange(
        &handle,
        b"GET /first HTTP/1.1\r\nHost: t\r\n\r\nGET /second HTTP/1.1\r\nHost: t\r\nConnection: close\r\n\r\n",
    )
    .await;

    let first = response.find("/first").expect("first answered");
    let second = response.find("/second").expect("second answered");
    assert!(first < second);
    assert_eq!(response.matches("HTTP/1.1 200 OK").count(), 2);

    handle.shutdown().await;
}

/// **VALUE**: Verifies HEAD gets headers with the real length but no body.
#[tokio::test]
async fn given_head_request_when_sent_then_no_body() {
    let site = tempfile::tempdir().expect("temp dir");
    fs::write(site.path().join("page.html"), "<h1>hello</h1>").expect("write");
    let server = WebServer::new(test_config());
    server.add_document_root(site.path());
    let handle = start(&server).await;

    let response = raw_exchange(
        &handle,
        b"HEAD /page.html HTTP/1.1\r\nHost: t\r\nConnection: close\r\n\r\n",
    )
    .await;

    assert!(response.contains("Content-Length: 14\r\n"));
    assert!(response.ends_with("\r\n\r\n"));

    handle.shutdown().await;
}

/// **VALUE**: Verifies binding an occupied port reports a bind error.
#[tokio::test]
async fn given_port_in_use_when_start_then_bind_error() {
    let first = WebServer::new(test_config());
    let handle = start(&first).await;

    let mut config = test_config();
    config.network.port = handle.local_addr().port();
    let second = WebServer::new(config);

    let error = second.start().await.err().expect("bind must fail");
    assert!(matches!(
        error,
        webserver_core::error::ServerError::Bind { .. }
    ));

    handle.shutdown().await;
}
