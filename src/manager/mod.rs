//! The session manager façade.

use rand::Rng;
use std::sync::OnceLock;
use time::{Duration, OffsetDateTime, PrimitiveDateTime};

use crate::error::{Error, Result};
use crate::session::now;
use crate::store::{BackendRegistry, StoreBackend};
use crate::{Id, IdGenerator, SessionConfig, SessionRecord};

/// Number of candidates tried by [`SessionManager::generate_id`] before giving up.
pub const MAX_ID_ATTEMPTS: usize = 3;

/// Horizon used as the validity window when `LifeTime` is zero.
pub const UNBOUNDED_LIFETIME_YEARS: i32 = 20;

static GLOBAL: OnceLock<SessionManager> = OnceLock::new();

/// Finds, stores, removes and garbage-collects sessions through the backend
/// selected by [`SessionConfig::store_type`].
///
/// Every operation creates its own backend from the [`BackendRegistry`] and
/// drops it before returning, so a manager can be shared freely between tasks.
/// Backend failures are logged and reported as `None` or `false`.
#[derive(Debug)]
pub struct SessionManager {
    config: SessionConfig,
    registry: BackendRegistry,
    generator: IdGenerator,
}

impl SessionManager {
    pub fn new(config: SessionConfig, registry: BackendRegistry) -> Self {
        if !registry.contains(&config.store_type) {
            tracing::warn!(
                store_type = %config.store_type,
                "no session store is registered under the configured store type"
            );
        }

        Self {
            config,
            registry,
            generator: IdGenerator::new(),
        }
    }

    /// Installs `manager` as the process-wide instance.
    ///
    /// Only the first call succeeds; later calls get their manager back.
    pub fn install(manager: SessionManager) -> std::result::Result<&'static SessionManager, SessionManager> {
        GLOBAL.set(manager)?;
        Ok(GLOBAL.wait())
    }

    /// Returns the process-wide instance, if one has been installed.
    pub fn global() -> Option<&'static SessionManager> {
        GLOBAL.get()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    pub fn store_type(&self) -> &str {
        &self.config.store_type
    }

    pub fn lifetime(&self) -> i64 {
        self.config.lifetime
    }

    pub fn gc_probability(&self) -> i64 {
        self.config.gc_probability
    }

    pub fn gc_max_lifetime(&self) -> i64 {
        self.config.gc_max_lifetime
    }

    /// Oldest creation time a live session may have at `now`.
    ///
    /// Saturates at the earliest representable time for lifetimes reaching
    /// past year -9999.
    pub fn valid_since(&self, now: OffsetDateTime) -> OffsetDateTime {
        if self.config.lifetime > 0 {
            seconds_before(now, self.config.lifetime)
        } else {
            years_before(now, UNBOUNDED_LIFETIME_YEARS)
        }
    }

    /// Creation time before which sessions are purged at `now`.
    ///
    /// `None` when `GcMaxLifeTime` is negative, since the cutoff would lie in
    /// the future and match every session.
    pub fn gc_cutoff(&self, now: OffsetDateTime) -> Option<OffsetDateTime> {
        if self.config.gc_max_lifetime < 0 {
            return None;
        }
        Some(seconds_before(now, self.config.gc_max_lifetime))
    }

    fn backend(&self) -> Option<Box<dyn StoreBackend>> {
        let backend = self.registry.create(&self.config.store_type);
        if backend.is_none() {
            tracing::error!(store_type = %self.config.store_type, "unknown session store type");
        }
        backend
    }

    /// Looks up a live session.
    ///
    /// Returns `None` for an empty id, an unknown or expired session, or a
    /// backend failure.
    #[tracing::instrument(name = "finding session", skip(self))]
    pub async fn find(&self, id: &Id) -> Option<SessionRecord> {
        if id.is_empty() {
            return None;
        }

        let valid_since = self.valid_since(now());
        let backend = self.backend()?;

        backend
            .find(id, valid_since)
            .await
            .unwrap_or_else(|err| {
                tracing::error!(err = %err, "failed to find session in store");
                None
            })
    }

    /// Persists `record`, replacing any session stored under the same id.
    ///
    /// A record with an empty id is rejected without contacting the backend.
    #[tracing::instrument(name = "storing session", skip(self, record), fields(id = %record.id()))]
    pub async fn store(&self, record: &SessionRecord) -> bool {
        if record.id().is_empty() {
            tracing::error!("internal error: refusing to store a session with an empty id");
            return false;
        }

        let Some(backend) = self.backend() else {
            return false;
        };

        backend.store(record).await.unwrap_or_else(|err| {
            tracing::error!(err = %err, "failed to save session to store");
            false
        })
    }

    /// Deletes the session stored at `id`.
    #[tracing::instrument(name = "removing session", skip(self))]
    pub async fn remove(&self, id: &Id) -> bool {
        if id.is_empty() {
            return false;
        }

        let Some(backend) = self.backend() else {
            return false;
        };

        backend.remove(id).await.unwrap_or_else(|err| {
            tracing::error!(err = %err, "failed to remove session from store");
            false
        })
    }

    /// Generates an id that no live session currently uses.
    ///
    /// Fails with the fatal [`Error::IdExhausted`] once [`MAX_ID_ATTEMPTS`]
    /// consecutive candidates collide.
    #[tracing::instrument(name = "generating session id", skip(self))]
    pub async fn generate_id(&self) -> Result<Id> {
        for attempt in 1..=MAX_ID_ATTEMPTS {
            let id = self.generator.candidate();
            if self.find(&id).await.is_none() {
                return Ok(id);
            }
            tracing::warn!(attempt, "generated session id collides with a live session");
        }

        tracing::error!(
            attempts = MAX_ID_ATTEMPTS,
            "unable to generate a unique session id"
        );
        Err(Error::IdExhausted {
            attempts: MAX_ID_ATTEMPTS,
        })
    }

    /// Purges expired sessions on roughly one call in `GcProbability`.
    ///
    /// Does nothing when `GcProbability` is zero or negative. Failures are
    /// logged and never propagated.
    pub async fn collect_garbage(&self) {
        let probability = self.config.gc_probability;
        if probability <= 0 {
            return;
        }

        let r = rand::rng().random_range(0..probability);
        tracing::debug!(rand = r, "session garbage collector");

        if r == 0 {
            self.purge().await;
        }
    }

    /// Unconditionally removes every session older than `GcMaxLifeTime`.
    ///
    /// Returns the number of sessions removed, or `None` if the backend is
    /// unavailable or failed.
    #[tracing::instrument(name = "purging expired sessions", skip(self))]
    pub async fn purge(&self) -> Option<u64> {
        tracing::debug!("session garbage collector started");

        let Some(cutoff) = self.gc_cutoff(now()) else {
            tracing::error!(
                gc_max_lifetime = self.config.gc_max_lifetime,
                "refusing to purge sessions with a negative GcMaxLifeTime"
            );
            return None;
        };
        let backend = self.backend()?;

        match backend.remove_older_than(cutoff).await {
            Ok(removed) => {
                tracing::debug!(removed, "session garbage collector finished");
                Some(removed)
            }
            Err(err) => {
                tracing::error!(err = %err, "failed to purge expired sessions");
                None
            }
        }
    }
}

fn earliest() -> OffsetDateTime {
    PrimitiveDateTime::MIN.assume_utc()
}

fn seconds_before(at: OffsetDateTime, seconds: i64) -> OffsetDateTime {
    at.checked_sub(Duration::seconds(seconds))
        .unwrap_or_else(earliest)
}

/// Same day and time `years` earlier. Feb 29 falls back to Feb 28.
fn years_before(at: OffsetDateTime, years: i32) -> OffsetDateTime {
    let year = at.year() - years;
    at.replace_year(year)
        .or_else(|_| at.replace_day(28).and_then(|at| at.replace_year(year)))
        .unwrap_or_else(|_| seconds_before(at, 365 * 86_400 * i64::from(years)))
}
