//! File extension to content type lookup.

use std::collections::HashMap;
use std::path::Path;

use once_cell::sync::Lazy;

/// Content type served for files with no extension or an unknown one.
pub const DEFAULT_MIME_TYPE: &str = "text/html";

static KNOWN_MIME_EXTENSIONS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("css", "text/css"),
        ("js", "application/javascript"),
        ("mov", "video/quicktime"),
        ("mp4", "video/mp4"),
        ("gif", "image/gif"),
        ("jpg", "image/jpeg"),
        ("png", "image/png"),
        ("html", "text/html"),
    ])
});

/// Content type for `file_name`, chosen from the text after its last `.`.
pub fn mime_type_for(file_name: &str) -> &'static str {
    match file_name.rsplit_once('.') {
        Some((_, extension)) => KNOWN_MIME_EXTENSIONS
            .get(extension)
            .copied()
            .unwrap_or(DEFAULT_MIME_TYPE),
        None => DEFAULT_MIME_TYPE,
    }
}

/// Content type for the file at `path`, looking only at its final component.
pub fn mime_type_for_path(path: &Path) -> &'static str {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(mime_type_for)
        .unwrap_or(DEFAULT_MIME_TYPE)
}
