//! Embedded SQLite document store.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, TransactionBehavior};
use serde_json::Value;

use super::{
    merge_fields, new_document_id, validate_all, Document, DocumentStore, Fields, GuardedWrite,
    Predicate, StoreError, StoreResult, SCHEMA,
};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Document store persisted in a SQLite database.
///
/// Bodies are stored as JSON text and filtered with `json_extract`. Blocking
/// SQLite calls run on the tokio blocking pool.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Self::initialize(conn)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn run<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock()?;
            f(&mut guard)
        })
        .await?
    }
}

/// Bind value and accepted `json_type` names for a predicate value.
fn bind_value(predicate: &Predicate) -> StoreResult<(&'static str, Option<SqlValue>)> {
    match &predicate.value {
        Value::Number(n) => {
            let bound = match n.as_i64() {
                Some(i) => SqlValue::Integer(i),
                None => SqlValue::Real(n.as_f64().unwrap_or(f64::NAN)),
            };
            Ok(("'integer', 'real'", Some(bound)))
        }
        Value::String(s) => Ok(("'text'", Some(SqlValue::Text(s.clone())))),
        Value::Bool(b) => Ok(("'true', 'false'", Some(SqlValue::Integer(i64::from(*b))))),
        Value::Null => Ok(("'null'", None)),
        Value::Array(_) | Value::Object(_) => {
            Err(StoreError::UnsupportedValue(predicate.field.clone()))
        }
    }
}

/// Build the WHERE clause for a conjunctive query. Values never compare
/// across JSON types, matching the in-memory store.
fn where_clause(collection: &str, predicates: &[Predicate]) -> StoreResult<(String, Vec<SqlValue>)> {
    validate_all(predicates)?;

    let mut sql = String::from("collection = ?");
    let mut binds = vec![SqlValue::Text(collection.to_string())];

    for predicate in predicates {
        let path = format!("$.{}", predicate.field);
        let (types, value) = bind_value(predicate)?;

        sql.push_str(&format!(" AND json_type(body, ?) IN ({})", types));
        binds.push(SqlValue::Text(path.clone()));

        if let Some(value) = value {
            sql.push_str(&format!(" AND json_extract(body, ?) {} ?", predicate.op.as_sql()));
            binds.push(SqlValue::Text(path));
            binds.push(value);
        }
    }

    Ok((sql, binds))
}

fn select(conn: &Connection, collection: &str, predicates: &[Predicate]) -> StoreResult<Vec<Document>> {
    let (clause, binds) = where_clause(collection, predicates)?;
    let mut stmt = conn.prepare(&format!(
        "SELECT id, body FROM documents WHERE {} ORDER BY id",
        clause
    ))?;

    let rows = stmt.query_map(params_from_iter(binds), |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut documents = Vec::new();
    for row in rows {
        let (id, body) = row?;
        documents.push(Document {
            id,
            fields: serde_json::from_str(&body)?,
        });
    }
    Ok(documents)
}

fn load(conn: &Connection, collection: &str, id: &str) -> StoreResult<Option<Fields>> {
    conn.query_row(
        "SELECT body FROM documents WHERE collection = ? AND id = ?",
        params![collection, id],
        |row| row.get::<_, String>(0),
    )
    .optional()?
    .map(|body| serde_json::from_str(&body).map_err(Into::into))
    .transpose()
}

fn insert(conn: &Connection, collection: &str, fields: &Fields) -> StoreResult<String> {
    let id = new_document_id();
    let body = serde_json::to_string(fields)?;
    conn.execute(
        "INSERT INTO documents (collection, id, body) VALUES (?1, ?2, ?3)",
        params![collection, id, body],
    )?;
    Ok(id)
}

fn merge_update(conn: &Connection, collection: &str, id: &str, patch: Fields) -> StoreResult<()> {
    let mut fields = load(conn, collection, id)?.ok_or_else(|| StoreError::NotFound(id.to_string()))?;
    merge_fields(&mut fields, patch);
    let body = serde_json::to_string(&fields)?;
    conn.execute(
        r#"
        UPDATE documents SET
            body = ?3,
            updated_at = datetime('now')
        WHERE collection = ?1 AND id = ?2
        "#,
        params![collection, id, body],
    )?;
    Ok(())
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn get_document(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let (collection, id) = (collection.to_string(), id.to_string());
        self.run(move |conn| {
            Ok(load(conn, &collection, &id)?.map(|fields| Document { id, fields }))
        })
        .await
    }

    async fn query(&self, collection: &str, predicates: &[Predicate]) -> StoreResult<Vec<Document>> {
        let (collection, predicates) = (collection.to_string(), predicates.to_vec());
        self.run(move |conn| select(conn, &collection, &predicates)).await
    }

    async fn insert_document(&self, collection: &str, fields: Fields) -> StoreResult<String> {
        let collection = collection.to_string();
        self.run(move |conn| insert(conn, &collection, &fields)).await
    }

    async fn update_document(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<()> {
        let (collection, id) = (collection.to_string(), id.to_string());
        self.run(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            merge_update(&tx, &collection, &id, fields)?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn delete_document(&self, collection: &str, id: &str) -> StoreResult<()> {
        let (collection, id) = (collection.to_string(), id.to_string());
        self.run(move |conn| {
            conn.execute(
                "DELETE FROM documents WHERE collection = ? AND id = ?",
                params![collection, id],
            )?;
            Ok(())
        })
        .await
    }

    async fn insert_unique(
        &self,
        collection: &str,
        fields: Fields,
        unique: &[Predicate],
    ) -> StoreResult<GuardedWrite<String>> {
        let (collection, unique) = (collection.to_string(), unique.to_vec());
        self.run(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            if !select(&tx, &collection, &unique)?.is_empty() {
                return Ok(GuardedWrite::Conflict);
            }
            let id = insert(&tx, &collection, &fields)?;
            tx.commit()?;
            Ok(GuardedWrite::Applied(id))
        })
        .await
    }

    async fn update_unique(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
        unique: &[Predicate],
        exclude_self: bool,
    ) -> StoreResult<GuardedWrite<()>> {
        let (collection, id, unique) = (collection.to_string(), id.to_string(), unique.to_vec());
        self.run(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let conflict = select(&tx, &collection, &unique)?
                .iter()
                .any(|doc| !(exclude_self && doc.id == id));
            if conflict {
                return Ok(GuardedWrite::Conflict);
            }
            merge_update(&tx, &collection, &id, fields)?;
            tx.commit()?;
            Ok(GuardedWrite::Applied(()))
        })
        .await
    }
}
