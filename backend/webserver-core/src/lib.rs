pub mod channel;
pub mod config;
pub mod content;
pub mod error;
pub mod http;
pub mod routing;
pub mod server;

#[cfg(test)]
mod tests;

pub use server::{ConnectionEvent, WebServer, WebServerHandle};

pub const SERVER_NAME: &str = "webserver";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const SERVER_SIGNATURE: &str = const_format::concatcp!(SERVER_NAME, "/", SERVER_VERSION);
