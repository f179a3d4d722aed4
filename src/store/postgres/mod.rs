use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;

use crate::store::{Error, StoreBackend, deserialize_value, serialize_value};
use crate::{Id, SessionRecord};

/// A builder for creating a `PostgresStore`.
///
/// This allows for customizing the table and schema names for session storage.
#[derive(Debug)]
pub struct PostgresStoreBuilder {
    pool: PgPool,
    table_name: String,
    create_table: bool,
    schema_name: Option<String>,
}

impl PostgresStoreBuilder {
    /// Creates a new builder with a database pool and default settings.
    pub fn new(pool: PgPool, create_table: bool) -> Self {
        Self {
            pool,
            table_name: "t_sessions".to_string(),
            create_table,
            schema_name: None,
        }
    }

    /// Sets a custom table name for the session store. Defaults to "t_sessions".
    pub fn table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    /// Sets a custom schema name for the session store.
    pub fn schema_name(mut self, schema_name: impl Into<String>) -> Self {
        self.schema_name = Some(schema_name.into());
        self
    }

    /// Builds the `PostgresStore`, creating the schema and table if requested.
    pub async fn build(self) -> Result<PostgresStore, sqlx::Error> {
        let table = if let Some(schema) = &self.schema_name {
            format!("\"{}\".\"{}\"", schema, self.table_name)
        } else {
            format!("\"{}\"", self.table_name)
        };

        if self.create_table {
            if let Some(schema) = &self.schema_name {
                sqlx::query(&format!("create schema if not exists \"{schema}\""))
                    .execute(&self.pool)
                    .await?;
            }

            let index = format!("idx_{}_created_at", self.table_name);
            sqlx::raw_sql(&format!(
                r#"
                create table if not exists {table} (
                    session_id text primary key,
                    created_at timestamptz not null,
                    payload bytea not null
                );
                -- for garbage collection
                create index if not exists "{index}" on {table}(created_at);
                "#
            ))
            .execute(&self.pool)
            .await?;
        }

        Ok(PostgresStore {
            pool: self.pool,
            table,
        })
    }
}

/// A Postgres-backed session store.
///
/// Cloning is cheap: clones share the connection pool.
#[derive(Clone, Debug)]
pub struct PostgresStore {
    pool: PgPool,
    table: String,
}

#[async_trait]
impl StoreBackend for PostgresStore {
    async fn find(
        &self,
        id: &Id,
        valid_since: OffsetDateTime,
    ) -> Result<Option<SessionRecord>, Error> {
        let query = format!(
            "select created_at, payload from {} where session_id = $1 and created_at >= $2",
            self.table
        );
        let row: Option<(OffsetDateTime, Vec<u8>)> = sqlx::query_as(&query)
            .bind(id.as_str())
            .bind(valid_since)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|(created_at, payload)| {
            Ok(SessionRecord::new(id.clone())
                .with_created_at(created_at)
                .with_payload(deserialize_value(&payload)?))
        })
        .transpose()
    }

    async fn store(&self, record: &SessionRecord) -> Result<bool, Error> {
        let payload = serialize_value(record.payload())?;
        let query = format!(
            r#"
            insert into {} (session_id, created_at, payload)
            values ($1, $2, $3)
            on conflict (session_id) do update
            set created_at = excluded.created_at, payload = excluded.payload
            "#,
            self.table
        );
        let result = sqlx::query(&query)
            .bind(record.id().as_str())
            .bind(record.created_at())
            .bind(payload)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove(&self, id: &Id) -> Result<bool, Error> {
        let query = format!("delete from {} where session_id = $1", self.table);
        let result = sqlx::query(&query)
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_older_than(&self, cutoff: OffsetDateTime) -> Result<u64, Error> {
        let query = format!("delete from {} where created_at < $1", self.table);
        let result = sqlx::query(&query)
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
