use crate::http::mime::{DEFAULT_MIME_TYPE, mime_type_for, mime_type_for_path};

use std::path::Path;

/// **VALUE**: Verifies every extension of the fixed table.
///
/// **WHY THIS MATTERS**: Browsers refuse to apply stylesheets or run scripts served with
/// the wrong content type, so a wrong entry breaks pages in confusing ways.
///
/// **BUG THIS CATCHES**: Would catch a typo or a dropped entry in the table.
#[test]
fn given_known_extensions_when_mime_type_for_then_returns_table_entry() {
    assert_eq!(mime_type_for("site.css"), "text/css");
    assert_eq!(mime_type_for("app.js"), "application/javascript");
    assert_eq!(mime_type_for("clip.mov"), "video/quicktime");
    assert_eq!(mime_type_for("clip.mp4"), "video/mp4");
    assert_eq!(mime_type_for("spinner.gif"), "image/gif");
    assert_eq!(mime_type_for("photo.jpg"), "image/jpeg");
    assert_eq!(mime_type_for("logo.png"), "image/png");
    assert_eq!(mime_type_for("index.html"), "text/html");
}

/// **VALUE**: Verifies the fallback for names without a recognised extension.
///
/// **BUG THIS CATCHES**: Would catch a lookup that panics or returns an empty type
/// for extension-less files such as `README`.
#[test]
fn given_unknown_or_missing_extension_when_mime_type_for_then_defaults_to_html() {
    assert_eq!(mime_type_for("README"), DEFAULT_MIME_TYPE);
    assert_eq!(mime_type_for("archive.tar.gz"), DEFAULT_MIME_TYPE);
    assert_eq!(mime_type_for("trailing."), DEFAULT_MIME_TYPE);
    assert_eq!(mime_type_for(""), DEFAULT_MIME_TYPE);
}

/// **VALUE**: Verifies only the text after the last dot is considered.
///
/// **BUG THIS CATCHES**: Would catch splitting on the first dot, which types
/// `jquery.min.js` as `text/html`.
#[test]
fn given_multiple_dots_when_mime_type_for_then_uses_last_segment() {
    assert_eq!(mime_type_for("jquery.min.js"), "application/javascript");
    assert_eq!(mime_type_for("photo.backup.png"), "image/png");
}

/// **VALUE**: Verifies lookup is case-sensitive, matching the table exactly.
#[test]
fn given_uppercase_extension_when_mime_type_for_then_defaults() {
    assert_eq!(mime_type_for("PHOTO.JPG"), DEFAULT_MIME_TYPE);
}

/// **VALUE**: Verifies directory names with dots don't leak into the lookup.
///
/// **BUG THIS CATCHES**: Would catch typing `/assets.v2/readme` by its directory.
#[test]
fn given_path_when_mime_type_for_path_then_uses_file_name_only() {
    assert_eq!(
        mime_type_for_path(Path::new("/srv/assets.css/readme")),
        DEFAULT_MIME_TYPE
    );
    assert_eq!(mime_type_for_path(Path::new("/srv/www/site.css")), "text/css");
}
