//! PostgreSQL implementation of the Datastore port.
//!
//! All collections share one table keyed by `(collection, id)` with a JSONB
//! body. Merges use the `||` operator (top-level merge). Every conditional
//! write is a single statement, so the precondition check and the write
//! are atomic.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{Collection, Datastore, Document, Precondition, StoredDocument};

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS documents (
        collection  TEXT        NOT NULL,
        id          TEXT        NOT NULL,
        data        JSONB       NOT NULL DEFAULT '{}'::jsonb,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        PRIMARY KEY (collection, id)
    )
"#;

const CREATE_DATA_INDEX: &str = r#"
    CREATE INDEX IF NOT EXISTS documents_data_idx
        ON documents USING GIN (data jsonb_path_ops)
"#;

/// PostgreSQL-backed document store.
pub struct PostgresDatastore {
    pool: PgPool,
}

impl PostgresDatastore {
    /// Creates a new PostgresDatastore with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the documents table and its index when missing.
    pub async fn ensure_schema(&self) -> Result<(), DomainError> {
        for statement in [CREATE_TABLE, CREATE_DATA_INDEX] {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| db_error("create schema", e))?;
        }
        Ok(())
    }
}

fn db_error(action: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("Failed to {}: {}", action, e))
}

fn into_document(collection: Collection, id: &str, value: Value) -> Result<Document, DomainError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(DomainError::database(format!(
            "{}/{} holds a non-object body: {}",
            collection, id, other
        ))),
    }
}

#[async_trait]
impl Datastore for PostgresDatastore {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, DomainError> {
        let row: Option<Json<Value>> =
            sqlx::query_scalar("SELECT data FROM documents WHERE collection = $1 AND id = $2")
                .bind(collection.name())
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("fetch document", e))?;

        row.map(|Json(value)| into_document(collection, id, value))
            .transpose()
    }

    async fn merge(
        &self,
        collection: Collection,
        id: &str,
        data: Document,
        precondition: Precondition,
    ) -> Result<bool, DomainError> {
        let patch = Json(Value::Object(data));

        let result = match &precondition {
            Precondition::Always => sqlx::query(
                r#"
                INSERT INTO documents (collection, id, data) VALUES ($1, $2, $3)
                ON CONFLICT (collection, id) DO UPDATE
                    SET data = documents.data || EXCLUDED.data, updated_at = now()
                "#,
            )
            .bind(collection.name())
            .bind(id)
            .bind(&patch)
            .execute(&self.pool)
            .await,

            Precondition::Absent => sqlx::query(
                r#"
                INSERT INTO documents (collection, id, data) VALUES ($1, $2, $3)
                ON CONFLICT (collection, id) DO NOTHING
                "#,
            )
            .bind(collection.name())
            .bind(id)
            .bind(&patch)
            .execute(&self.pool)
            .await,

            // Null also matches a missing document, so this one may insert.
            Precondition::FieldEquals { field, value } if value.is_null() => sqlx::query(
                r#"
                INSERT INTO documents (collection, id, data) VALUES ($1, $2, $3)
                ON CONFLICT (collection, id) DO UPDATE
                    SET data = documents.data || EXCLUDED.data, updated_at = now()
                    WHERE COALESCE(documents.data -> $4, 'null'::jsonb) = 'null'::jsonb
                "#,
            )
            .bind(collection.name())
            .bind(id)
            .bind(&patch)
            .bind(field)
            .execute(&self.pool)
            .await,

            Precondition::FieldEquals { field, value } => sqlx::query(
                r#"
                UPDATE documents
                    SET data = data || $3, updated_at = now()
                    WHERE collection = $1 AND id = $2 AND data -> $4 = $5
                "#,
            )
            .bind(collection.name())
            .bind(id)
            .bind(&patch)
            .bind(field)
            .bind(Json(value))
            .execute(&self.pool)
            .await,

            Precondition::FieldNotEquals { field, value } => sqlx::query(
                r#"
                INSERT INTO documents (collection, id, data) VALUES ($1, $2, $3)
                ON CONFLICT (collection, id) DO UPDATE
                    SET data = documents.data || EXCLUDED.data, updated_at = now()
                    WHERE (documents.data -> $4) IS DISTINCT FROM $5
                "#,
            )
            .bind(collection.name())
            .bind(id)
            .bind(&patch)
            .bind(field)
            .bind(Json(value))
            .execute(&self.pool)
            .await,
        }
        .map_err(|e| db_error("merge document", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_by_field(
        &self,
        collection: Collection,
        field: &str,
        value: &Value,
        limit: usize,
    ) -> Result<Vec<StoredDocument>, DomainError> {
        let rows: Vec<(String, Json<Value>)> = sqlx::query_as(
            r#"
            SELECT id, data FROM documents
            WHERE collection = $1 AND data @> jsonb_build_object($2::text, $3::jsonb)
            ORDER BY id
            LIMIT $4
            "#,
        )
        .bind(collection.name())
        .bind(field)
        .bind(Json(value))
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("query documents", e))?;

        rows.into_iter()
            .map(|(id, Json(data))| {
                let data = into_document(collection, &id, data)?;
                Ok(StoredDocument { id, data })
            })
            .collect()
    }

    async fn add(&self, collection: Collection, data: Document) -> Result<String, DomainError> {
        let id = uuid::Uuid::new_v4().to_string();

        sqlx::query("INSERT INTO documents (collection, id, data) VALUES ($1, $2, $3)")
            .bind(collection.name())
            .bind(&id)
            .bind(Json(Value::Object(data)))
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("append document", e))?;

        Ok(id)
    }

    async fn increment(
        &self,
        collection: Collection,
        id: &str,
        field: &str,
        delta: i64,
        also_merge: Document,
    ) -> Result<i64, DomainError> {
        let updated: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO documents (collection, id, data)
                VALUES ($1, $2, $5::jsonb || jsonb_build_object($3::text, $4::bigint))
            ON CONFLICT (collection, id) DO UPDATE
                SET data = documents.data || $5::jsonb || jsonb_build_object(
                        $3::text,
                        COALESCE((documents.data ->> $3)::bigint, 0) + $4::bigint
                    ),
                    updated_at = now()
            RETURNING (data ->> $3)::bigint
            "#,
        )
        .bind(collection.name())
        .bind(id)
        .bind(field)
        .bind(delta)
        .bind(Json(Value::Object(also_merge)))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("increment counter", e))?;

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_bodies_become_documents() {
        let doc = into_document(Collection::Mandates, "m1", json!({ "a": 1 })).unwrap();
        assert_eq!(doc["a"], 1);
    }

    #[test]
    fn non_object_bodies_are_corrupt() {
        let err = into_document(Collection::Mandates, "m1", json!([1])).unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(err.message.contains("mandates/m1"));
    }
}
