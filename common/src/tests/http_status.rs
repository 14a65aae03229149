use crate::HttpStatusCode;

/// **VALUE**: Verifies the status line text for the codes the server emits itself.
///
/// **WHY THIS MATTERS**: Browsers and HTTP clients only read the number, but humans reading
/// logs and curl output read the phrase. A wrong phrase on 404 or 500 is confusing.
///
/// **BUG THIS CATCHES**: Would catch a typo or a swapped arm in `reason_phrase()`.
#[test]
fn given_server_emitted_codes_when_reason_phrase_then_matches_rfc() {
    assert_eq!(HttpStatusCode::OK.reason_phrase(), "OK");
    assert_eq!(HttpStatusCode::NOT_FOUND.reason_phrase(), "Not Found");
    assert_eq!(
        HttpStatusCode::INTERNAL_ERROR.reason_phrase(),
        "Internal Server Error"
    );
    assert_eq!(
        HttpStatusCode::SWITCHING_PROTOCOLS.reason_phrase(),
        "Switching Protocols"
    );
    assert_eq!(
        HttpStatusCode::PAYLOAD_TOO_LARGE.reason_phrase(),
        "Payload Too Large"
    );
}

/// **VALUE**: Verifies unknown codes still get a class-level phrase.
///
/// **BUG THIS CATCHES**: Would catch a fallback that returns an empty phrase and produces
/// a malformed status line for handler-chosen codes.
#[test]
fn given_unknown_code_when_reason_phrase_then_uses_class_fallback() {
    assert_eq!(HttpStatusCode(299).reason_phrase(), "Success");
    assert_eq!(HttpStatusCode(418).reason_phrase(), "Client Error");
    assert_eq!(HttpStatusCode(599).reason_phrase(), "Server Error");
}

/// **VALUE**: Verifies class predicates.
#[test]
fn given_codes_when_classified_then_predicates_agree() {
    assert!(HttpStatusCode::OK.is_success());
    assert!(HttpStatusCode::BAD_REQUEST.is_client_error());
    assert!(!HttpStatusCode::BAD_REQUEST.is_server_error());
    assert!(HttpStatusCode::INTERNAL_ERROR.is_server_error());
    assert!(!HttpStatusCode::INTERNAL_ERROR.is_client_error());
}

/// **VALUE**: Verifies Display produces `<code> <phrase>`, the form used in access logs.
#[test]
fn given_status_when_displayed_then_code_and_phrase() {
    assert_eq!(HttpStatusCode::from(404).to_string(), "404 Not Found");
}
