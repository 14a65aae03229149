use crate::ErrorLocation;
use std::panic::Location;

/// **VALUE**: Verifies that `ErrorLocation::from()` records the caller's file and line.
///
/// **WHY THIS MATTERS**: Every error in the server carries an `ErrorLocation`. If the
/// capture is wrong, log lines for failed requests and dropped connections point nowhere.
///
/// **BUG THIS CATCHES**: Would catch if `Location::caller()` stops being propagated,
/// or if the file or line fields are swapped or left empty.
#[test]
fn given_location_caller_when_error_location_created_then_captures_file_and_line() {
    // GIVEN/WHEN: Capturing the current location
    let location = ErrorLocation::from(Location::caller());

    // THEN: File and line point at this test
    assert!(
        location.file.ends_with("error_location.rs"),
        "Should capture this file, got {}",
        location.file
    );
    assert!(location.line > 0, "Should capture a line number");
    assert!(location.column > 0, "Should capture a column number");
}

/// **VALUE**: Verifies the `[file:line:column]` display format used in every error message.
///
/// **WHY THIS MATTERS**: Error strings are grepped out of the server log; a changed format
/// breaks that workflow silently.
///
/// **BUG THIS CATCHES**: Would catch a Display impl that drops the brackets or a component.
#[test]
fn given_error_location_when_formatted_then_produces_bracketed_triplet() {
    // GIVEN: A fixed location
    let location = ErrorLocation {
        file: "src/server/mod.rs",
        line: 42,
        column: 7,
    };

    // WHEN: Formatting
    let formatted = location.to_string();

    // THEN: Exact bracketed format
    assert_eq!(formatted, "[src/server/mod.rs:42:7]");
}

/// **VALUE**: Verifies that `#[track_caller]` propagation gives each call site its own line.
///
/// **BUG THIS CATCHES**: Would catch a helper that forgets `#[track_caller]` and so reports
/// its own body for every error it builds.
#[test]
fn given_multiple_call_sites_when_capturing_location_then_each_has_unique_line() {
    // GIVEN: A helper that captures its caller
    #[track_caller]
    fn capture_location() -> ErrorLocation {
        ErrorLocation::from(Location::caller())
    }

    // WHEN: Capturing from two consecutive lines
    let first = capture_location();
    let second = capture_location();

    // THEN: Same file, consecutive lines
    assert_eq!(first.file, second.file);
    assert_eq!(first.line + 1, second.line, "Lines should be sequential");
}

/// **VALUE**: Verifies `ErrorLocation` serializes as a plain object.
///
/// **BUG THIS CATCHES**: Would catch removal of the `Serialize` derive, which the server
/// relies on when reporting errors as JSON.
#[test]
fn given_error_location_when_serialized_then_contains_fields() {
    let location = ErrorLocation {
        file: "a.rs",
        line: 3,
        column: 9,
    };

    let json = serde_json::to_value(location).expect("ErrorLocation should serialize");

    assert_eq!(json["file"], "a.rs");
    assert_eq!(json["line"], 3);
    assert_eq!(json["column"], 9);
}
