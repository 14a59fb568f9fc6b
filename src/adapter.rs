//! The invocation adapter.
//!
//! One adapter wraps one application instance for the lifetime of the
//! execution environment. Every invocation flows through `handle`, which
//! is infallible: malformed events become 400s, application faults become
//! 500s, and the warm environment stays alive for the next event.

use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt as _;
use http::StatusCode;
use lambda_runtime::{service_fn, Context, Error, LambdaEvent};
use serde_json::Value;

use crate::app::{App, BoxError, InvocationMetadata};
use crate::event::parse_event;
use crate::lifespan::{LifespanMode, LifespanState};
use crate::response::{encode_response, error_response, InvocationResponse};
use crate::staging::ScratchDirs;

#[derive(Debug, Clone, Default)]
pub struct AdapterConfig {
    /// Whether the adapter drives the application's startup/shutdown hooks.
    pub lifespan: LifespanMode,
    /// Stage prefix stripped from incoming paths before the application
    /// sees them, e.g. `/prod` for a REST API deployed to a named stage.
    pub base_path: Option<String>,
}

impl AdapterConfig {
    /// Configuration with the lifespan mode read from `LIFESPAN_MODE`.
    pub fn from_env() -> Self {
        Self {
            lifespan: LifespanMode::from_env(),
            base_path: None,
        }
    }
}

/// Owns the single application instance across warm invocations.
///
/// The adapter itself keeps no per-invocation state; the only thing shared
/// between events is the application, which the platform's
/// one-invocation-at-a-time contract already serializes access to.
pub struct Adapter<A> {
    app: A,
    lifespan: LifespanState,
    base_path: Option<String>,
}

impl<A: App> Adapter<A> {
    pub fn new(app: A, config: AdapterConfig) -> Self {
        Self {
            app,
            lifespan: LifespanState::new(config.lifespan),
            base_path: config.base_path,
        }
    }

    /// Translate one invocation event against the wrapped application.
    ///
    /// Never returns an error to the platform: every fault is absorbed
    /// into a well-formed response payload.
    pub async fn handle(&self, payload: Value, metadata: InvocationMetadata) -> InvocationResponse {
        let (mut request, format) = match parse_event(&payload, self.base_path.as_deref()) {
            Ok(parsed) => parsed,
            Err(error) => {
                tracing::warn!(
                    request_id = %metadata.request_id,
                    %error,
                    "rejecting malformed invocation event"
                );
                return error_response(
                    StatusCode::BAD_REQUEST,
                    "invalid_request",
                    "invocation event does not describe an HTTP request",
                );
            }
        };

        if let Err(error) = self.lifespan.ensure_started(&self.app).await {
            tracing::error!(
                request_id = %metadata.request_id,
                %error,
                "application startup hook failed"
            );
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "startup_failed",
                "application failed to start",
            );
        }

        let method = request.method().clone();
        let path = request.uri().path().to_string();
        request.extensions_mut().insert(metadata.clone());

        match AssertUnwindSafe(self.app.call(request)).catch_unwind().await {
            Ok(Ok(response)) => {
                tracing::info!(
                    request_id = %metadata.request_id,
                    %method,
                    path = %path,
                    status = response.status().as_u16(),
                    "invocation completed"
                );
                encode_response(response, format)
            }
            Ok(Err(error)) => {
                tracing::error!(
                    request_id = %metadata.request_id,
                    %method,
                    path = %path,
                    %error,
                    "application failed while handling request"
                );
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "application failed while handling the request",
                )
            }
            Err(panic) => {
                tracing::error!(
                    request_id = %metadata.request_id,
                    %method,
                    path = %path,
                    reason = panic_reason(&panic),
                    "application panicked while handling request"
                );
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "application failed while handling the request",
                )
            }
        }
    }

    /// Borrow the wrapped application instance.
    pub fn app(&self) -> &A {
        &self.app
    }

    /// Fire the application's shutdown hook, at most once.
    ///
    /// Lambda never delivers a teardown invocation; call this from a
    /// SIGTERM handler or an extensions hook when graceful shutdown
    /// matters to the application.
    pub async fn shutdown(&self) -> Result<(), BoxError> {
        self.lifespan.shutdown(&self.app).await
    }
}

impl From<&Context> for InvocationMetadata {
    fn from(context: &Context) -> Self {
        Self {
            request_id: context.request_id.clone(),
            deadline_ms: context.deadline,
            invoked_function_arn: context.invoked_function_arn.clone(),
        }
    }
}

fn panic_reason(panic: &(dyn std::any::Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("opaque panic payload")
}

/// Drive the Lambda runtime with a constructed adapter.
pub async fn run<A: App>(adapter: Adapter<A>) -> Result<(), Error> {
    let adapter = &adapter;
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        let metadata = InvocationMetadata::from(&event.context);
        Ok::<InvocationResponse, Error>(adapter.handle(event.payload, metadata).await)
    }))
    .await
}

/// Cold-start entrypoint: stage the scratch directories, construct the
/// application, wrap it once, and serve invocations until the platform
/// tears the environment down.
///
/// Staging completes before the factory runs, so application construction
/// may touch the scratch paths. A staging or construction failure aborts
/// cold start; nothing after that point does.
pub async fn serve<A, F, Fut>(
    dirs: ScratchDirs,
    make_app: F,
    config: AdapterConfig,
) -> Result<(), Error>
where
    A: App,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<A, BoxError>>,
{
    dirs.ensure()?;
    let app = make_app().await?;
    run(Adapter::new(app, config)).await
}
