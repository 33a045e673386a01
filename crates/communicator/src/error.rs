//! Error types for the messaging core

use thiserror::Error;

/// Result type alias using the communicator Error
pub type Result<T> = std::result::Result<T, Error>;

/// Communicator error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Address resolution failed: {0}")]
    AddressResolution(String),

    #[error("Failed to bind 127.0.0.1:{port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("Codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Communicator already started")]
    AlreadyStarted,

    #[error("Communicator not started")]
    NotStarted,

    #[error("Communicator channel closed")]
    ChannelClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
