use std::path::PathBuf;

use thiserror::Error;

/// A scratch directory could not be created.
///
/// Raised only for real filesystem failures (quota, permissions); a
/// directory that already exists is treated as success by the initializer.
/// This error is fatal for the execution environment.
#[derive(Debug, Error)]
#[error("failed to create scratch directory {}: {source}", path.display())]
pub struct StagingError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// The invocation event could not be destructured into an HTTP request.
///
/// These never reach the wrapped application; the adapter answers them
/// with a 400 response instead.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("invocation payload is not a JSON object")]
    NotAnObject,

    /// Neither a REST (v1) nor an HTTP API (v2) payload shape.
    #[error("unrecognized invocation payload format")]
    UnrecognizedFormat,

    #[error("malformed invocation payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("invalid HTTP method: {0}")]
    Method(#[from] http::method::InvalidMethod),

    #[error("could not assemble request URI: {0}")]
    Uri(#[from] http::uri::InvalidUri),

    #[error("invalid header name: {0}")]
    HeaderName(#[from] http::header::InvalidHeaderName),

    #[error("invalid header value: {0}")]
    HeaderValue(#[from] http::header::InvalidHeaderValue),

    #[error("request body is not valid base64: {0}")]
    Body(#[from] base64::DecodeError),
}
