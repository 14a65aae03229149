//! Plain HTTP/1.1 handling: request heads, bodies, responses and content types.
//!
//! Only what a local development server needs: fixed-length bodies, no
//! chunked uploads, no ranges, no compression.

pub mod body;
pub mod mime;
pub mod request;
pub mod response;
pub(crate) mod wire;

pub use body::UploadedParts;
pub use mime::mime_type_for;
pub use request::{Headers, Method, QUERY_STRING_PARAMETER, QueryParams, Request};
pub use response::{Body, Response};
