//! Session records and their payload.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use std::collections::hash_map;
use time::OffsetDateTime;

mod id;
use crate::store::{self, deserialize_value, serialize_value};
pub use id::{Id, IdGenerator};

/// A single server-side session.
///
/// The creation time has second resolution. The payload is an opaque field map
/// that no part of this crate interprets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionRecord {
    id: Id,
    created_at: OffsetDateTime,
    payload: SessionMap,
}

impl SessionRecord {
    /// Creates an empty session created now.
    pub fn new(id: impl Into<Id>) -> Self {
        Self {
            id: id.into(),
            created_at: now(),
            payload: SessionMap::default(),
        }
    }

    /// Overrides the creation time, truncated to whole seconds.
    pub fn with_created_at(mut self, created_at: OffsetDateTime) -> Self {
        self.created_at = truncate_to_second(created_at);
        self
    }

    pub fn with_payload(mut self, payload: SessionMap) -> Self {
        self.payload = payload;
        self
    }

    pub fn id(&self) -> &Id {
        &self.id
    }

    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    pub fn payload(&self) -> &SessionMap {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut SessionMap {
        &mut self.payload
    }

    pub fn into_payload(self) -> SessionMap {
        self.payload
    }
}

/// Field map holding the encoded values of a session.
///
/// Values are stored as bytes and decoded lazily with the crate codec.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionMap(HashMap<String, Vec<u8>>);

impl SessionMap {
    pub fn new(map: HashMap<String, Vec<u8>>) -> Self {
        Self(map)
    }

    /// Decodes the value stored at `field`.
    pub fn get<T: DeserializeOwned>(&self, field: &str) -> Result<Option<T>, store::Error> {
        self.0
            .get(field)
            .map(|value| deserialize_value(value))
            .transpose()
    }

    /// Encodes `value` into `field`, returning the previous raw value.
    pub fn insert<T: Serialize>(
        &mut self,
        field: impl Into<String>,
        value: &T,
    ) -> Result<Option<Vec<u8>>, store::Error> {
        let encoded = serialize_value(value)?;
        Ok(self.0.insert(field.into(), encoded))
    }

    pub fn get_raw(&self, field: &str) -> Option<&[u8]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn insert_raw(&mut self, field: impl Into<String>, value: Vec<u8>) -> Option<Vec<u8>> {
        self.0.insert(field.into(), value)
    }

    pub fn remove(&mut self, field: &str) -> Option<Vec<u8>> {
        self.0.remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> hash_map::Iter<'_, String, Vec<u8>> {
        self.0.iter()
    }

    pub fn into_inner(self) -> HashMap<String, Vec<u8>> {
        self.0
    }
}

impl From<HashMap<String, Vec<u8>>> for SessionMap {
    fn from(value: HashMap<String, Vec<u8>>) -> Self {
        Self(value)
    }
}

/// Current UTC time truncated to whole seconds.
pub(crate) fn now() -> OffsetDateTime {
    truncate_to_second(OffsetDateTime::now_utc())
}

pub(crate) fn truncate_to_second(at: OffsetDateTime) -> OffsetDateTime {
    at.replace_nanosecond(0).unwrap_or(at)
}
