//! # Sesman: server-side session store manager
//!
//! `sesman` creates, retrieves, persists and expires small opaque per-client records
//! ("sessions") through a pluggable storage backend selected by name at runtime.
//!
//! The [`SessionManager`] is the entry point. It owns an immutable [`SessionConfig`]
//! and a [`BackendRegistry`](store::BackendRegistry) that maps store-type names to
//! backend constructors. Every manager operation creates a fresh backend, uses it
//! and drops it, so the manager holds no shared mutable backend state.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use sesman::store::{BackendRegistry, MemoryStore};
//! use sesman::{SessionConfig, SessionManager, SessionRecord};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), sesman::Error> {
//!     let registry = BackendRegistry::new();
//!     registry.register_memory(MemoryStore::new());
//!
//!     let config = SessionConfig::build()
//!         .store_type("memory")
//!         .lifetime(3600)
//!         .gc_probability(100)
//!         .gc_max_lifetime(7200);
//!
//!     let manager = SessionManager::new(config, registry);
//!
//!     let id = manager.generate_id().await?;
//!     let mut record = SessionRecord::new(id.clone());
//!     record.payload_mut().insert("user_id", &42_i64)?;
//!     assert!(manager.store(&record).await);
//!
//!     let found = manager.find(&id).await.unwrap();
//!     let user_id: Option<i64> = found.payload().get("user_id")?;
//!     assert_eq!(user_id, Some(42));
//!
//!     manager.collect_garbage().await;
//!     Ok(())
//! }
//! ```
//!
//! # Stores
//!
//! - `memory`: [`MemoryStore`](store::MemoryStore), process-local.
//! - `file`: [`FileStore`](store::FileStore), one file per session in a directory.
//! - `postgres`: `PostgresStore`, requires the `postgres-store` feature.
//! - `redis`: `RedisStore`, requires the `redis-store` feature.
//!
//! Any type implementing [`StoreBackend`](store::StoreBackend) can be registered
//! under a custom name.
//!
//! ## Serialization
//!
//! Session payload fields are stored as bytes. The typed helpers on
//! [`SessionMap`] and the persistent stores encode values with
//! [`bincode`](https://crates.io/crates/bincode) (default) or
//! [`rmp-serde`](https://crates.io/crates/rmp-serde) (`messagepack` feature).
//!
//! # Garbage Collection
//!
//! [`SessionManager::collect_garbage`] purges expired records with probability
//! `1 / GcProbability` per call. Wrap a tower service in [`GcLayer`] to make every
//! completed request a candidate trigger.

mod config;
pub use config::*;

mod error;
pub use error::*;

mod manager;
pub use manager::*;

mod service;
pub use service::*;

mod session;
pub use session::*;

pub mod store;

pub use time;

#[cfg(feature = "redis-store")]
pub use fred;

#[cfg(feature = "postgres-store")]
pub use sqlx;
