use thiserror::Error;

/// A convenience `Result` alias using [`ParleyError`].
pub type ParleyResult<T> = Result<T, ParleyError>;

/// Top-level error type for Parley.
///
/// Each variant corresponds to a subsystem that can produce errors.
#[derive(Error, Debug)]
pub enum ParleyError {
    /// Login or cookie validation failed.
    #[error("Auth error: {0}")]
    Auth(String),

    /// A session id or transcript was malformed.
    #[error("Session error: {0}")]
    Session(String),

    /// Persisting or fetching a transcript failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The inference endpoint could not produce a reply.
    #[error("Inference error: {0}")]
    Inference(String),

    /// An outbound HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Request signing could not be performed (e.g. missing credentials).
    #[error("Signing error: {0}")]
    Signing(String),

    /// A request carried unusable input (blank or oversized prompt, bad id).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An error from the web gateway layer.
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
