//! Run an `http`-speaking application on AWS Lambda behind API Gateway.
//!
//! A Lambda execution environment is provisioned cold, then reused warm for
//! many invocations. This crate owns the two translations that make a
//! request/response application fit that model:
//!
//! - **Cold start**: stage the ephemeral scratch directories the
//!   application expects under `/tmp` before the application is
//!   constructed, so no code path fails on a missing directory at first
//!   use ([`ScratchDirs`]).
//! - **Per invocation**: destructure the API Gateway event (REST v1 or
//!   HTTP API v2 payloads) into an `http::Request`, await the
//!   application's response, and re-encode it as the payload shape the
//!   platform expects, including base64 handling for binary bodies and
//!   the platform's repeated-header conventions ([`Adapter`]).
//!
//! Startup/shutdown hooks run at most once per environment, governed by
//! [`LifespanMode`]; a warm environment must not cycle them per request.
//!
//! ```no_run
//! use bytes::Bytes;
//! use http::{header, Request, Response, StatusCode};
//! use lambda_gateway_adapter::{serve, AdapterConfig, App, BoxError, LifespanMode, ScratchDirs};
//!
//! struct Health;
//!
//! #[async_trait::async_trait]
//! impl App for Health {
//!     async fn call(&self, _request: Request<Bytes>) -> Result<Response<Bytes>, BoxError> {
//!         Ok(Response::builder()
//!             .status(StatusCode::OK)
//!             .header(header::CONTENT_TYPE, "application/json")
//!             .body(Bytes::from_static(b"{\"status\":\"ok\"}"))?)
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), lambda_runtime::Error> {
//!     lambda_gateway_adapter::init_tracing();
//!     let dirs = ScratchDirs::under("/tmp", &["uploads", "cached_chunks"]);
//!     let config = AdapterConfig {
//!         lifespan: LifespanMode::Off,
//!         ..AdapterConfig::default()
//!     };
//!     serve(dirs, || async { Ok::<_, BoxError>(Health) }, config).await
//! }
//! ```

pub mod adapter;
pub mod app;
pub mod error;
pub mod event;
pub mod lifespan;
pub mod response;
pub mod staging;

pub use adapter::{run, serve, Adapter, AdapterConfig};
pub use app::{App, BoxError, InvocationMetadata};
pub use error::{EventError, StagingError};
pub use event::PayloadFormat;
pub use lifespan::LifespanMode;
pub use response::InvocationResponse;
pub use staging::ScratchDirs;

/// Initialize the tracing subscriber once per process.
///
/// Filter comes from `RUST_LOG` when set. Timestamps are left off since
/// CloudWatch stamps every line. Calling this again on a warm start is a
/// no-op.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .without_time()
        .try_init();
}
