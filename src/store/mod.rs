//! Storage backends and the registry that selects them by name.

#[cfg(feature = "redis-store")]
pub mod redis;

#[cfg(feature = "postgres-store")]
pub mod postgres;

mod file;
mod memory;
mod registry;
mod store_trait;

pub use file::*;
pub use memory::*;
pub use registry::*;
pub use store_trait::*;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use time::OffsetDateTime;

use crate::{Id, SessionMap, SessionRecord};

#[cfg(feature = "bincode")]
pub(crate) fn serialize_value<T: Serialize>(value: &T) -> Result<Vec<u8>, Error> {
    bincode::serde::encode_to_vec(value, bincode::config::standard())
        .map_err(|e| Error::Encode(e.to_string()))
}

#[cfg(feature = "bincode")]
pub(crate) fn deserialize_value<T: DeserializeOwned>(value: &[u8]) -> Result<T, Error> {
    bincode::serde::decode_from_slice(value, bincode::config::standard())
        .map(|(value, _)| value)
        .map_err(|e| Error::Decode(e.to_string()))
}

#[cfg(feature = "messagepack")]
pub(crate) fn serialize_value<T: Serialize>(value: &T) -> Result<Vec<u8>, Error> {
    rmp_serde::to_vec(value).map_err(|e| Error::Encode(e.to_string()))
}

#[cfg(feature = "messagepack")]
pub(crate) fn deserialize_value<T: DeserializeOwned>(value: &[u8]) -> Result<T, Error> {
    rmp_serde::from_slice(value).map_err(|e| Error::Decode(e.to_string()))
}

/// On-disk layout of a record for stores that persist it as a single blob.
#[derive(Serialize, Deserialize)]
struct StoredRecord {
    id: Id,
    created_at: i64,
    payload: SessionMap,
}

pub(crate) fn encode_record(record: &SessionRecord) -> Result<Vec<u8>, Error> {
    serialize_value(&StoredRecord {
        id: record.id().clone(),
        created_at: record.created_at().unix_timestamp(),
        payload: record.payload().clone(),
    })
}

pub(crate) fn decode_record(bytes: &[u8]) -> Result<SessionRecord, Error> {
    let stored: StoredRecord = deserialize_value(bytes)?;
    record_from_parts(stored.id, stored.created_at, stored.payload)
}

pub(crate) fn record_from_parts(
    id: Id,
    created_at: i64,
    payload: SessionMap,
) -> Result<SessionRecord, Error> {
    let created_at = OffsetDateTime::from_unix_timestamp(created_at)
        .map_err(|e| Error::Decode(e.to_string()))?;
    Ok(SessionRecord::new(id)
        .with_created_at(created_at)
        .with_payload(payload))
}
