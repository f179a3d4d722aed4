use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::store::{FileStore, MemoryStore, StoreBackend};

type Constructor = Arc<dyn Fn() -> Box<dyn StoreBackend> + Send + Sync>;

/// Maps store-type names to backend constructors.
///
/// Names are matched case-insensitively. Cloning the registry is cheap and clones
/// share the same set of registrations.
///
/// # Example
///
/// ```rust
/// use sesman::store::{BackendRegistry, MemoryStore};
///
/// let registry = BackendRegistry::new();
/// registry.register_memory(MemoryStore::new());
///
/// assert!(registry.create("Memory").is_some());
/// assert!(registry.create("mongodb").is_none());
/// ```
#[derive(Clone, Default)]
pub struct BackendRegistry {
    constructors: Arc<RwLock<HashMap<String, Constructor>>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `constructor` under `name`, replacing any previous registration.
    pub fn register<F, B>(&self, name: &str, constructor: F)
    where
        F: Fn() -> B + Send + Sync + 'static,
        B: StoreBackend + 'static,
    {
        let constructor: Constructor =
            Arc::new(move || Box::new(constructor()) as Box<dyn StoreBackend>);
        let name = name.to_lowercase();
        tracing::debug!(store_type = %name, "registering session store");
        self.constructors.write().insert(name, constructor);
    }

    /// Creates a new backend instance for `name`, or `None` if nothing is registered.
    pub fn create(&self, name: &str) -> Option<Box<dyn StoreBackend>> {
        let constructor = self.constructors.read().get(&name.to_lowercase()).cloned()?;
        Some(constructor())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.read().contains_key(&name.to_lowercase())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.constructors.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Registers `store` under `memory`. Every created backend shares its data.
    pub fn register_memory(&self, store: MemoryStore) {
        self.register("memory", move || store.clone());
    }

    /// Registers `store` under `file`.
    pub fn register_file(&self, store: FileStore) {
        self.register("file", move || store.clone());
    }

    /// Registers `store` under `postgres`.
    #[cfg(feature = "postgres-store")]
    pub fn register_postgres(&self, store: crate::store::postgres::PostgresStore) {
        self.register("postgres", move || store.clone());
    }

    /// Registers `store` under `redis`.
    #[cfg(feature = "redis-store")]
    pub fn register_redis<C>(&self, store: crate::store::redis::RedisStore<C>)
    where
        C: crate::store::redis::RedisClientLike,
    {
        self.register("redis", move || store.clone());
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("names", &self.names())
            .finish()
    }
}
