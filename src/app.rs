//! The application-facing seam.
//!
//! The adapter speaks to the wrapped application through the standard
//! `http` request/response types, the same interface the rest of the Rust
//! HTTP ecosystem is built on. The application is an external collaborator:
//! this crate never constructs one, it only wraps the single instance built
//! at cold start.

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A request-handling application hosted behind the adapter.
///
/// `call` is awaited to full completion for every invocation; the adapter
/// never streams a partial response back to the platform. The lifecycle
/// hooks default to no-ops so applications without startup/shutdown work
/// need not mention them.
#[async_trait]
pub trait App: Send + Sync {
    async fn call(&self, request: Request<Bytes>) -> Result<Response<Bytes>, BoxError>;

    /// Invoked at most once per warm execution environment, before the
    /// first request is dispatched, when lifecycle management is enabled.
    async fn startup(&self) -> Result<(), BoxError> {
        Ok(())
    }

    /// Invoked at most once per warm execution environment, when lifecycle
    /// management is enabled and startup has run.
    async fn shutdown(&self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Invocation metadata from the Lambda context, attached to each synthetic
/// request as an extension.
#[derive(Debug, Clone, Default)]
pub struct InvocationMetadata {
    pub request_id: String,
    /// Invocation deadline, in milliseconds since the Unix epoch.
    pub deadline_ms: u64,
    pub invoked_function_arn: String,
}

impl InvocationMetadata {
    /// Remaining time budget for this invocation. Saturates at zero once
    /// the deadline has passed.
    pub fn remaining_time_ms(&self) -> u64 {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(0);
        self.deadline_ms.saturating_sub(now_ms)
    }
}
