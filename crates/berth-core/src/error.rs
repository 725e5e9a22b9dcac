//! Error types shared across the crate.

use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

/// Result alias for berth operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Main error type for berth operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A collaborator subprocess exited non-zero.
    #[error("command `{command}` failed ({status}):\n{output}")]
    Process {
        command: String,
        status: ExitStatus,
        output: String,
    },

    /// A collaborator subprocess could not be launched at all.
    #[error("failed to launch `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// A required configuration key is absent.
    #[error("missing required config key '{key}'")]
    MissingConfig { key: String },

    /// A runner was asked to serve a branch with no deployed checkout.
    #[error("branch '{branch}' has no current checkout")]
    MissingCheckout { branch: String },

    /// Filesystem state required by an operation is missing or unusable.
    #[error("filesystem error at {path}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Variable expansion exceeded its substitution budget.
    #[error("variable expansion exceeded {limit} substitutions")]
    ExpansionLimit { limit: usize },

    /// A script template referenced a slot the renderer does not provide.
    #[error("unknown template slot '{slot}'")]
    UnknownSlot { slot: String },

    /// A service did not come under supervision within the wait budget.
    #[error("service '{service}' not supervised after {timeout:?}")]
    SuperviseTimeout { service: String, timeout: Duration },
}

impl Error {
    /// Adapter for `map_err` on `std::io` results that concern one path.
    pub(crate) fn fs(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Error {
        let path = path.into();
        move |source| Error::Filesystem { path, source }
    }
}
