pub mod config;
pub mod connection;
pub mod envelope;
pub mod handler;
pub mod http;
pub mod server;

pub use config::ConfigError;
pub use connection::ConnectionError;
pub use envelope::EnvelopeError;
pub use handler::HandlerError;
pub use http::HttpError;
pub use server::ServerError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Server(#[from] ServerError),

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    #[error(transparent)]
    Handler(#[from] HandlerError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
