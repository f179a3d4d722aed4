#![allow(dead_code)]

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sesman::store::{BackendRegistry, Error, MemoryStore, StoreBackend};
use sesman::time::{Duration, OffsetDateTime};
use sesman::{Id, SessionConfig, SessionManager, SessionRecord};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct TestUser {
    pub id: i64,
    pub name: String,
}

pub fn create_test_user() -> TestUser {
    TestUser {
        id: 1,
        name: "Test User".to_string(),
    }
}

pub fn record_aged(id: &str, seconds: i64) -> SessionRecord {
    SessionRecord::new(id).with_created_at(OffsetDateTime::now_utc() - Duration::seconds(seconds))
}

/// Counts calls per operation and answers `find` with a live record for the
/// first `live_finds` lookups.
#[derive(Debug, Default)]
pub struct Calls {
    pub created: AtomicUsize,
    pub finds: AtomicUsize,
    pub stores: AtomicUsize,
    pub removes: AtomicUsize,
    pub purges: AtomicUsize,
    pub live_finds: AtomicUsize,
}

impl Calls {
    pub fn total_operations(&self) -> usize {
        self.finds.load(Ordering::SeqCst)
            + self.stores.load(Ordering::SeqCst)
            + self.removes.load(Ordering::SeqCst)
            + self.purges.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct CountingStore {
    calls: Arc<Calls>,
}

#[async_trait]
impl StoreBackend for CountingStore {
    async fn find(&self, id: &Id, _valid_since: OffsetDateTime) -> Result<Option<SessionRecord>, Error> {
        self.calls.finds.fetch_add(1, Ordering::SeqCst);
        let live = self
            .calls
            .live_finds
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        Ok(live.then(|| SessionRecord::new(id.clone())))
    }

    async fn store(&self, _record: &SessionRecord) -> Result<bool, Error> {
        self.calls.stores.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    async fn remove(&self, _id: &Id) -> Result<bool, Error> {
        self.calls.removes.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    async fn remove_older_than(&self, _cutoff: OffsetDateTime) -> Result<u64, Error> {
        self.calls.purges.fetch_add(1, Ordering::SeqCst);
        Ok(0)
    }
}

/// A backend whose every operation fails.
#[derive(Debug, Clone)]
pub struct FailingStore;

#[async_trait]
impl StoreBackend for FailingStore {
    async fn find(&self, _id: &Id, _valid_since: OffsetDateTime) -> Result<Option<SessionRecord>, Error> {
        Err(Error::Backend("connection refused".to_string()))
    }

    async fn store(&self, _record: &SessionRecord) -> Result<bool, Error> {
        Err(Error::Backend("connection refused".to_string()))
    }

    async fn remove(&self, _id: &Id) -> Result<bool, Error> {
        Err(Error::Backend("connection refused".to_string()))
    }

    async fn remove_older_than(&self, _cutoff: OffsetDateTime) -> Result<u64, Error> {
        Err(Error::Backend("connection refused".to_string()))
    }
}

pub fn counting_manager(config: SessionConfig) -> (SessionManager, Arc<Calls>) {
    let calls = Arc::new(Calls::default());
    let registry = BackendRegistry::new();
    let shared = Arc::clone(&calls);
    registry.register("counting", move || {
        shared.created.fetch_add(1, Ordering::SeqCst);
        CountingStore {
            calls: Arc::clone(&shared),
        }
    });

    let manager = SessionManager::new(config.store_type("counting"), registry);
    (manager, calls)
}

pub fn memory_manager(config: SessionConfig) -> (SessionManager, MemoryStore) {
    let store = MemoryStore::new();
    let registry = BackendRegistry::new();
    registry.register_memory(store.clone());

    let manager = SessionManager::new(config.store_type("memory"), registry);
    (manager, store)
}
