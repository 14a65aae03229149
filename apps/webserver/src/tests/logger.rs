// Unit tests for logger initialization
// Every initialize() call in this binary lives in this one test: the global
// logger can only be installed once per process.

use crate::error::WebserverError;
use crate::logger::{LOG_FILE_NAME, initialize};

use std::path::PathBuf;

/// **VALUE**: Verifies a bad log directory is an error and later calls are idempotent.
///
/// **WHY THIS MATTERS**: A typo in `--log-dir` must produce a readable error at startup,
/// and a second initialization path (tests, embedding) must not crash the process.
///
/// **BUG THIS CATCHES**: Would catch:
/// - `fern::log_file()` being unwrapped instead of propagated
/// - The Once/AtomicBool guards being removed, making fern panic on the second call
#[test]
fn given_invalid_log_dir_when_initialized_twice_then_error_then_ok() {
    // GIVEN: A path that cannot hold a file
    let invalid_dir = PathBuf::from("/dev/null/invalid-path");

    // WHEN: Initializing with it
    let first = initialize(Some(&invalid_dir), None);

    // THEN: A Webserver error names the log file
    match first {
        Err(WebserverError::Webserver { message, .. }) => {
            assert!(message.contains(LOG_FILE_NAME), "{message}");
        }
        other => panic!("expected a Webserver error, got {other:?}"),
    }

    // WHEN: Initializing again with a valid directory
    let valid_dir = tempfile::tempdir().expect("temp dir");
    let second = initialize(Some(valid_dir.path()), None);

    // THEN: The call is a no-op that succeeds
    assert!(second.is_ok(), "second initialization should be a no-op");
}
