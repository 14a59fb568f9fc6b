//! Lifecycle hook management.
//!
//! Startup/shutdown hooks are meant to run once per process lifetime, not
//! once per request. A warm execution environment serves many invocations
//! from one process, so the adapter latches startup on first use instead of
//! cycling the hooks around every event.

use std::env;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tokio::sync::Mutex;

use crate::app::{App, BoxError};

/// Whether the adapter drives the application's startup/shutdown hooks.
///
/// `Off` is appropriate when the hosting platform does not model a
/// persistent process lifecycle, or when the application was already
/// started by other means before the adapter wrapped it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifespanMode {
    /// Attempt startup once; if the hook fails, log and keep serving
    /// without lifecycle management.
    #[default]
    Auto,
    /// Startup must succeed before any request is dispatched.
    On,
    /// Never invoke the hooks.
    Off,
}

#[derive(Debug, Error)]
#[error("unrecognized lifespan mode `{0}`, expected auto, on, or off")]
pub struct ParseLifespanError(String);

impl FromStr for LifespanMode {
    type Err = ParseLifespanError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "on" => Ok(Self::On),
            "off" => Ok(Self::Off),
            other => Err(ParseLifespanError(other.to_string())),
        }
    }
}

impl LifespanMode {
    pub const ENV_VAR: &'static str = "LIFESPAN_MODE";

    /// Read the mode from `LIFESPAN_MODE`, falling back to `Auto` when the
    /// variable is unset or holds an unrecognized value.
    pub fn from_env() -> Self {
        match env::var(Self::ENV_VAR) {
            Ok(raw) => raw.parse().unwrap_or_else(|error| {
                tracing::warn!(%error, "falling back to lifespan mode `auto`");
                Self::Auto
            }),
            Err(_) => Self::Auto,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StartupStatus {
    NotStarted,
    Started,
    /// Auto mode attempted startup and the hook failed; lifecycle
    /// management stays disabled for the rest of the environment.
    Unsupported,
}

/// Latches the hooks to at-most-once semantics across warm invocations.
#[derive(Debug)]
pub(crate) struct LifespanState {
    mode: LifespanMode,
    startup: Mutex<StartupStatus>,
    shutdown_fired: AtomicBool,
}

impl LifespanState {
    pub(crate) fn new(mode: LifespanMode) -> Self {
        Self {
            mode,
            startup: Mutex::new(StartupStatus::NotStarted),
            shutdown_fired: AtomicBool::new(false),
        }
    }

    /// Run the startup hook if this environment still owes one.
    ///
    /// Returns an error only in `On` mode when the hook fails; the status
    /// stays `NotStarted` in that case so the next invocation retries
    /// rather than serving an application that never came up.
    pub(crate) async fn ensure_started<A: App>(&self, app: &A) -> Result<(), BoxError> {
        if self.mode == LifespanMode::Off {
            return Ok(());
        }

        let mut status = self.startup.lock().await;
        if *status != StartupStatus::NotStarted {
            return Ok(());
        }

        match app.startup().await {
            Ok(()) => {
                *status = StartupStatus::Started;
                tracing::info!("application startup hook completed");
                Ok(())
            }
            Err(error) if self.mode == LifespanMode::On => Err(error),
            Err(error) => {
                *status = StartupStatus::Unsupported;
                tracing::warn!(%error, "startup hook failed, continuing without lifecycle management");
                Ok(())
            }
        }
    }

    /// Run the shutdown hook at most once, and only if startup ran.
    pub(crate) async fn shutdown<A: App>(&self, app: &A) -> Result<(), BoxError> {
        if self.mode == LifespanMode::Off {
            return Ok(());
        }
        if *self.startup.lock().await != StartupStatus::Started {
            return Ok(());
        }
        if self.shutdown_fired.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        app.shutdown().await
    }
}
