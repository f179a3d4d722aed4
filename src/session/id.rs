use rand::rngs::OsRng;
use rand::{Rng, TryRngCore};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use time::OffsetDateTime;

/// An opaque session identifier.
///
/// Generated ids are 64 lowercase hex characters, but any caller-supplied string is
/// accepted. The empty id (`Id::default()`) is never persisted.
#[derive(Clone, Debug, Default, Deserialize, Serialize, Eq, Hash, PartialEq, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Id(String);

impl Id {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Id {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_owned()))
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for Id {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for Id {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Produces candidate session ids by hashing several entropy sources with BLAKE3.
///
/// The input mixes the wall clock in milliseconds, the host name, a per-generator
/// sequence number, the process id, the calling thread, a random token fixed for
/// the lifetime of the generator, and a fresh random `u64`.
#[derive(Debug)]
pub struct IdGenerator {
    host: String,
    instance: u64,
    seq: AtomicU64,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator {
    pub fn new() -> Self {
        let host = hostname::get()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|err| {
                tracing::warn!(err = %err, "failed to read host name for session id entropy");
                String::new()
            });

        Self {
            host,
            instance: secure_random_u64(),
            seq: AtomicU64::new(0),
        }
    }

    /// Hashes a fresh entropy input into a candidate id. Uniqueness against live
    /// sessions is checked by the caller.
    pub fn candidate(&self) -> Id {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
        let thread = format!("{:?}", std::thread::current().id());

        let mut hasher = blake3::Hasher::new();
        hasher.update(millis.to_string().as_bytes());
        hasher.update(self.host.as_bytes());
        hasher.update(seq.to_string().as_bytes());
        hasher.update(std::process::id().to_string().as_bytes());
        hasher.update(thread.as_bytes());
        hasher.update(self.instance.to_string().as_bytes());
        hasher.update(secure_random_u64().to_string().as_bytes());

        Id(hasher.finalize().to_hex().to_string())
    }
}

fn secure_random_u64() -> u64 {
    OsRng.try_next_u64().unwrap_or_else(|err| {
        tracing::warn!(err = %err, "os rng unavailable, falling back to thread rng");
        rand::rng().random()
    })
}
