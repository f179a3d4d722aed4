mod lua;

use async_trait::async_trait;
use fred::clients::Pool;
use fred::interfaces::{HashesInterface, KeysInterface, LuaInterface};
use std::collections::HashMap;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::OnceCell;

use crate::store::redis::lua::{
    PURGE_SCRIPT, PURGE_SCRIPT_HASH, REMOVE_SCRIPT, REMOVE_SCRIPT_HASH, STORE_SCRIPT,
    STORE_SCRIPT_HASH,
};
use crate::store::{Error, StoreBackend, deserialize_value, record_from_parts, serialize_value};
use crate::{Id, SessionRecord};

/// Client capabilities required by [`RedisStore`].
pub trait RedisClientLike:
    HashesInterface + KeysInterface + LuaInterface + Clone + Send + Sync + 'static
{
}

impl<C> RedisClientLike for C where
    C: HashesInterface + KeysInterface + LuaInterface + Clone + Send + Sync + 'static
{
}

/// A redis session store implementation.
///
/// Each session is a Redis Hash (`created_at`, `payload`) at `{prefix}:s:{id}`.
/// A sorted set at `{prefix}:index` scores session ids by creation time so that
/// garbage collection can find stale sessions without scanning the keyspace.
/// Session keys live under their own `s:` namespace, so no id can name the index.
///
/// Writes, removals and purges run as Lua scripts so the hash and the index
/// never diverge. The purge script touches keys it does not declare, so the
/// store is not suitable for Redis Cluster.
#[derive(Clone, Debug)]
pub struct RedisStore<C: RedisClientLike = Pool> {
    client: Arc<C>,
    prefix: Arc<str>,
}

impl<C> RedisStore<C>
where
    C: RedisClientLike,
{
    pub fn new(client: Arc<C>) -> Self {
        Self::with_prefix(client, "session")
    }

    pub fn with_prefix(client: Arc<C>, prefix: &str) -> Self {
        Self {
            client,
            prefix: Arc::from(prefix),
        }
    }

    fn session_prefix(&self) -> String {
        format!("{}:s:", self.prefix)
    }

    fn key(&self, id: &Id) -> String {
        format!("{}{}", self.session_prefix(), id)
    }

    fn index_key(&self) -> String {
        format!("{}:index", self.prefix)
    }
}

#[async_trait]
impl<C> StoreBackend for RedisStore<C>
where
    C: RedisClientLike,
{
    async fn find(
        &self,
        id: &Id,
        valid_since: OffsetDateTime,
    ) -> Result<Option<SessionRecord>, Error> {
        let mut fields = self
            .client
            .hgetall::<HashMap<String, Vec<u8>>, _>(self.key(id))
            .await?;

        let (Some(created_at), Some(payload)) =
            (fields.remove("created_at"), fields.remove("payload"))
        else {
            return Ok(None);
        };

        let created_at = std::str::from_utf8(&created_at)
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or_else(|| Error::Decode(format!("invalid created_at for session {id}")))?;

        if created_at < valid_since.unix_timestamp() {
            return Ok(None);
        }

        let record = record_from_parts(id.clone(), created_at, deserialize_value(&payload)?)?;
        Ok(Some(record))
    }

    async fn store(&self, record: &SessionRecord) -> Result<bool, Error> {
        let hash = script_hash(self.client.as_ref(), &STORE_SCRIPT_HASH, STORE_SCRIPT).await?;
        let payload = serialize_value(record.payload())?;

        let stored: i64 = self
            .client
            .evalsha(
                hash,
                vec![self.key(record.id()), self.index_key()],
                (
                    record.id().as_str(),
                    record.created_at().unix_timestamp(),
                    payload.as_slice(),
                ),
            )
            .await?;

        Ok(stored == 1)
    }

    async fn remove(&self, id: &Id) -> Result<bool, Error> {
        let hash = script_hash(self.client.as_ref(), &REMOVE_SCRIPT_HASH, REMOVE_SCRIPT).await?;

        let deleted: i64 = self
            .client
            .evalsha(hash, vec![self.key(id), self.index_key()], id.as_str())
            .await?;

        Ok(deleted > 0)
    }

    async fn remove_older_than(&self, cutoff: OffsetDateTime) -> Result<u64, Error> {
        let hash = script_hash(self.client.as_ref(), &PURGE_SCRIPT_HASH, PURGE_SCRIPT).await?;
        let prefix = self.session_prefix();

        let purged: i64 = self
            .client
            .evalsha(
                hash,
                vec![self.index_key()],
                (cutoff.unix_timestamp(), prefix.as_str()),
            )
            .await?;

        Ok(purged.max(0) as u64)
    }
}

async fn script_hash<'a, C>(
    client: &C,
    once_cell: &'a OnceCell<String>,
    script: &str,
) -> Result<&'a String, Error>
where
    C: LuaInterface + Send + Sync,
{
    let hash = once_cell
        .get_or_try_init(|| async {
            let hash = fred::util::sha1_hash(script);
            if !client.script_exists::<bool, _>(&hash).await? {
                let _: () = client.script_load(script).await?;
            }
            Ok::<String, fred::error::Error>(hash)
        })
        .await?;

    Ok(hash)
}
