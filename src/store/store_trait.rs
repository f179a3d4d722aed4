use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{Id, SessionRecord};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Encoding failed with: {0}")]
    Encode(String),

    #[error("Decoding failed with: {0}")]
    Decode(String),

    #[error("I/O failed with: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Backend(String),
}

#[cfg(feature = "redis-store")]
impl From<fred::error::Error> for Error {
    fn from(err: fred::error::Error) -> Self {
        Error::Backend(err.to_string())
    }
}

#[cfg(feature = "postgres-store")]
impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Error::Backend(err.to_string())
    }
}

/// Persistence contract implemented by every session backend.
///
/// The manager creates one backend per operation through the
/// [`BackendRegistry`](super::BackendRegistry) and drops it afterwards, so
/// implementations should be cheap handles over whatever shared resource
/// (map, directory, pool) actually holds the data.
#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// Gets the session stored at `id` if it was created at or after `valid_since`.
    async fn find(&self, id: &Id, valid_since: OffsetDateTime)
    -> Result<Option<SessionRecord>, Error>;

    /// Inserts `record`, replacing any session already stored under its id.
    ///
    /// Returns `true` if the record was persisted.
    async fn store(&self, record: &SessionRecord) -> Result<bool, Error>;

    /// Deletes the session stored at `id`.
    ///
    /// Returns `true` if a session was deleted.
    async fn remove(&self, id: &Id) -> Result<bool, Error>;

    /// Deletes every session created before `cutoff`.
    ///
    /// Returns the number of sessions deleted.
    async fn remove_older_than(&self, cutoff: OffsetDateTime) -> Result<u64, Error>;
}
