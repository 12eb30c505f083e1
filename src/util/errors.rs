//! Error types for workspace provisioning.

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error while provisioning an overlay workspace.
#[derive(Debug, Error)]
pub enum Error {
    /// A toolchain invocation exited unsuccessfully.
    #[error("`{command}` failed ({status})\n{stderr}")]
    ExternalCommand {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("{}:{line}: {message}", path.display())]
    ManifestParse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("{} is not a {expected}", path.display())]
    LayoutConflict { path: PathBuf, expected: &'static str },

    #[error("cannot resolve `{reference}`: {reason}")]
    Resolution { reference: String, reason: String },

    #[error("failed to {operation} {}", path.display())]
    Filesystem {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("`{package}` is already redirected to {existing}, refusing to redirect it to {requested}")]
    RedirectConflict {
        package: String,
        existing: String,
        requested: String,
    },
}

impl Error {
    pub(crate) fn external(command: String, status: ExitStatus, stderr: &[u8]) -> Self {
        Error::ExternalCommand {
            command,
            status: status.to_string(),
            stderr: String::from_utf8_lossy(stderr).trim_end().to_string(),
        }
    }

    pub(crate) fn fs(operation: &'static str, path: &Path, source: io::Error) -> Self {
        Error::Filesystem {
            operation,
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn resolution(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Resolution {
            reference: reference.into(),
            reason: reason.into(),
        }
    }
}

/// Extension for attaching filesystem context to `io::Result`.
pub(crate) trait IoResultExt<T> {
    fn fs_context(self, operation: &'static str, path: &Path) -> Result<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn fs_context(self, operation: &'static str, path: &Path) -> Result<T> {
        self.map_err(|e| Error::fs(operation, path, e))
    }
}
