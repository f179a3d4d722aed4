use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use time::OffsetDateTime;

use crate::store::{Error, StoreBackend};
use crate::{Id, SessionRecord};

/// An in-memory session store implementation.
///
/// Clones share the same underlying map, which is what the registry hands out
/// for every operation.
///
/// ### Note
///
/// Sessions live only as long as the process. Do not use this when several
/// processes serve the same application.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Arc<DashMap<Id, SessionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if a session is stored under `id`, regardless of its age.
    pub fn contains(&self, id: &Id) -> bool {
        self.data.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[async_trait]
impl StoreBackend for MemoryStore {
    async fn find(
        &self,
        id: &Id,
        valid_since: OffsetDateTime,
    ) -> Result<Option<SessionRecord>, Error> {
        Ok(self
            .data
            .get(id)
            .filter(|record| record.created_at() >= valid_since)
            .map(|record| record.value().clone()))
    }

    async fn store(&self, record: &SessionRecord) -> Result<bool, Error> {
        self.data.insert(record.id().clone(), record.clone());
        Ok(true)
    }

    async fn remove(&self, id: &Id) -> Result<bool, Error> {
        Ok(self.data.remove(id).is_some())
    }

    async fn remove_older_than(&self, cutoff: OffsetDateTime) -> Result<u64, Error> {
        let mut removed = 0;
        self.data.retain(|_, record| {
            let keep = record.created_at() >= cutoff;
            if !keep {
                removed += 1;
            }
            keep
        });
        Ok(removed)
    }
}
