//! Shared building blocks for the web server workspace.
//!
//! - **common** (this crate): error location capture and HTTP status codes
//! - **webserver-core**: the HTTP + persistent channel server
//! - **webserver**: the runnable shell wiring config, logging and the core together

pub mod error;
pub mod http_status;

pub use error::error_location::ErrorLocation;
pub use http_status::HttpStatusCode;

#[cfg(test)]
mod tests;
