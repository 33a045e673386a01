//! Error types for the test driver

use std::time::Duration;
use thiserror::Error;

/// Result type alias using the driver Error
pub type Result<T> = std::result::Result<T, Error>;

/// Test driver error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Collaborator failed: {0}")]
    Collaborator(String),

    #[error("Deadline of {0:?} expired waiting for the target")]
    Deadline(Duration),

    #[error("Notification stream closed")]
    StreamClosed,

    #[error("Communicator error: {0}")]
    Communicator(#[from] uiharness_communicator::Error),
}
