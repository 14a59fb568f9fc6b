//! Scratch directory staging for cold start.
//!
//! Lambda gives each execution environment ephemeral storage under `/tmp`,
//! but nothing under it exists until somebody creates it. Applications that
//! assume a working directory is present (upload buffers, derived-data
//! caches) would fail on their first request in a fresh environment, so the
//! entrypoint stages these directories before the application is
//! constructed.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StagingError;

/// The fixed set of ephemeral directories an application expects to exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScratchDirs {
    paths: Vec<PathBuf>,
}

impl ScratchDirs {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Convenience constructor for a set of named directories under a common
    /// root, e.g. `ScratchDirs::under("/tmp", &["uploads", "cached_chunks"])`.
    pub fn under<P: AsRef<Path>>(root: P, names: &[&str]) -> Self {
        let root = root.as_ref();
        Self::new(names.iter().map(|name| root.join(name)))
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Create every directory in the set, including missing ancestors.
    ///
    /// Idempotent: directories left over from a previous invocation of a
    /// warm environment count as success. Any other filesystem failure
    /// aborts cold start, since an application missing one of its expected
    /// directories cannot be trusted to handle any invocation.
    pub fn ensure(&self) -> Result<(), StagingError> {
        for path in &self.paths {
            fs::create_dir_all(path).map_err(|source| StagingError {
                path: path.clone(),
                source,
            })?;
            tracing::debug!(path = %path.display(), "scratch directory ready");
        }
        Ok(())
    }
}
