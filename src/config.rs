use serde::Deserialize;

use crate::error::{Error, Result};

/// Session settings, read once at startup and handed to the
/// [`SessionManager`](crate::SessionManager).
///
/// Deserializes from a `Session` table using the keys `StoreType`,
/// `GcProbability`, `GcMaxLifeTime` and `LifeTime`.
///
/// # Example
///
/// ```rust
/// use sesman::SessionConfig;
///
/// let config = SessionConfig::build()
///     .store_type("Memory")
///     .gc_probability(1000)
///     .gc_max_lifetime(1440)
///     .lifetime(0);
///
/// assert_eq!(config.store_type, "memory");
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SessionConfig {
    /// Name of the registered backend. Matched case-insensitively.
    #[serde(rename = "StoreType")]
    pub store_type: String,
    /// Garbage is collected on roughly one call in `gc_probability`.
    /// Zero or negative disables collection.
    #[serde(rename = "GcProbability")]
    pub gc_probability: i64,
    /// Age in seconds after which a session is removed by the collector.
    #[serde(rename = "GcMaxLifeTime")]
    pub gc_max_lifetime: i64,
    /// Validity window in seconds. Zero means sessions never expire on lookup.
    #[serde(rename = "LifeTime")]
    pub lifetime: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            store_type: "memory".to_string(),
            gc_probability: 1000,
            gc_max_lifetime: 1440,
            lifetime: 0,
        }
    }
}

#[derive(Deserialize)]
struct Settings {
    #[serde(rename = "Session", default)]
    session: SessionConfig,
}

impl SessionConfig {
    /// Creates a new `SessionConfig` with default values.
    pub fn build() -> Self {
        Self::default()
    }

    /// Parses the `[Session]` table of a TOML settings document.
    ///
    /// Missing keys keep their defaults.
    pub fn from_toml_str(settings: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(settings)?;
        let mut config = settings.session;
        config.store_type = config.store_type.to_lowercase();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.store_type.is_empty() {
            return Err(Error::InvalidConfig("StoreType must not be empty".to_string()));
        }
        if self.gc_max_lifetime < 0 {
            return Err(Error::InvalidConfig(format!(
                "GcMaxLifeTime must not be negative, got {}",
                self.gc_max_lifetime
            )));
        }
        if self.lifetime < 0 {
            return Err(Error::InvalidConfig(format!(
                "LifeTime must not be negative, got {}",
                self.lifetime
            )));
        }
        Ok(())
    }

    pub fn store_type(mut self, store_type: impl Into<String>) -> Self {
        self.store_type = store_type.into().to_lowercase();
        self
    }

    pub fn gc_probability(mut self, gc_probability: i64) -> Self {
        self.gc_probability = gc_probability;
        self
    }

    pub fn gc_max_lifetime(mut self, seconds: i64) -> Self {
        self.gc_max_lifetime = seconds;
        self
    }

    pub fn lifetime(mut self, seconds: i64) -> Self {
        self.lifetime = seconds;
        self
    }
}
