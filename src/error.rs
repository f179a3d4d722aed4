use thiserror::Error;

use crate::store;

/// Errors surfaced by [`SessionManager`](crate::SessionManager) and configuration loading.
///
/// Routine manager failures (unknown backend, missing or expired session, backend
/// I/O errors) are logged and reported as `None` or `false` instead.
/// `Store` carries codec errors from the [`SessionMap`](crate::SessionMap) helpers.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] store::Error),

    #[error("unable to generate a unique session id after {attempts} attempts")]
    IdExhausted { attempts: usize },

    #[error("failed to parse session configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid session configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Returns `true` for conditions that should be escalated to an operator
    /// rather than retried by the caller.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::IdExhausted { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
