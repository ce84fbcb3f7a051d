//! Event emission error types.

use thiserror::Error;

/// Errors from publishing a domain event.
#[derive(Debug, Error)]
pub enum EmitError {
    /// Broker connectivity was never confirmed (or failed at startup);
    /// the emitter refuses to publish until it is.
    #[error("event broker is not ready: {0}")]
    NotReady(String),

    /// The payload is not a JSON object and cannot carry a transaction id.
    #[error("invalid event payload: {0}")]
    Payload(String),

    /// Payload serialization failed.
    #[error("event serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The broker rejected or failed the publish.
    #[error("event transport error: {0}")]
    Transport(String),
}
