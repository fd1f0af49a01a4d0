use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{AppError, AppResult};

/// The document collections this app persists. Closed set so collection
/// names never reach the SQL layer as arbitrary strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Users,
    Likes,
    Messages,
    Matches,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Users,
        Collection::Likes,
        Collection::Messages,
        Collection::Matches,
    ];

    pub fn table(self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Likes => "likes",
            Collection::Messages => "messages",
            Collection::Matches => "matches",
        }
    }
}

/// One stored document: external id plus its JSON payload.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

impl Document {
    /// Typed view of the payload. Ranking and matching only ever see typed
    /// structs; mismatches fail fast here instead of leaking loose JSON.
    pub fn decode<T: DeserializeOwned>(&self, collection: Collection) -> AppResult<T> {
        serde_json::from_value(self.data.clone()).map_err(|source| AppError::SchemaMismatch {
            collection: collection.table(),
            id: self.id.clone(),
            source,
        })
    }
}

/// Generic JSON-document CRUD over sqlite, one `(id, data)` table per
/// collection. This is the whole persistence boundary: callers never write
/// their own SQL against it.
#[derive(Clone)]
pub struct DocStore {
    pool: SqlitePool,
}

impl DocStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// The underlying pool, for multi-write transactions composed from the
    /// executor-generic helpers below.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> AppResult<()> {
        for collection in Collection::ALL {
            let sql = format!(
                "CREATE TABLE IF NOT EXISTS {} (id TEXT PRIMARY KEY, data TEXT NOT NULL)",
                collection.table()
            );
            sqlx::query(&sql).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn get(&self, collection: Collection, id: &str) -> AppResult<Option<Document>> {
        fetch_doc(&self.pool, collection, id).await
    }

    pub async fn get_as<T: DeserializeOwned>(
        &self,
        collection: Collection,
        id: &str,
    ) -> AppResult<Option<T>> {
        match self.get(collection, id).await? {
            Some(doc) => Ok(Some(doc.decode(collection)?)),
            None => Ok(None),
        }
    }

    pub async fn list_all(&self, collection: Collection) -> AppResult<Vec<Document>> {
        let sql = format!(
            "SELECT id, data FROM {} ORDER BY rowid",
            collection.table()
        );
        let rows: Vec<(String, String)> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        rows_to_docs(rows)
    }

    pub async fn list_all_as<T: DeserializeOwned>(
        &self,
        collection: Collection,
    ) -> AppResult<Vec<T>> {
        decode_all(self.list_all(collection).await?, collection)
    }

    /// Server-side equality filter on one top-level field (a json path
    /// works too, e.g. `users[0]`).
    pub async fn list_by_field(
        &self,
        collection: Collection,
        field: &str,
        value: &str,
    ) -> AppResult<Vec<Document>> {
        let sql = format!(
            "SELECT id, data FROM {} WHERE json_extract(data, ?) = ? ORDER BY rowid",
            collection.table()
        );
        let rows: Vec<(String, String)> = sqlx::query_as(&sql)
            .bind(format!("$.{field}"))
            .bind(value)
            .fetch_all(&self.pool)
            .await?;
        rows_to_docs(rows)
    }

    pub async fn list_by_field_as<T: DeserializeOwned>(
        &self,
        collection: Collection,
        field: &str,
        value: &str,
    ) -> AppResult<Vec<T>> {
        decode_all(self.list_by_field(collection, field, value).await?, collection)
    }

    /// Insert under a caller-chosen id; errors if the id already exists.
    pub async fn create<T: Serialize>(
        &self,
        collection: Collection,
        id: &str,
        data: &T,
    ) -> AppResult<()> {
        insert_doc(&self.pool, collection, id, &serde_json::to_value(data)?).await
    }

    /// Insert or fully replace the document under `id`.
    pub async fn upsert<T: Serialize>(
        &self,
        collection: Collection,
        id: &str,
        data: &T,
    ) -> AppResult<()> {
        upsert_doc(&self.pool, collection, id, &serde_json::to_value(data)?).await
    }

    /// Merge-patch an existing document; `NotFound` if there is none.
    pub async fn update<T: Serialize>(
        &self,
        collection: Collection,
        id: &str,
        patch: &T,
    ) -> AppResult<()> {
        patch_doc(&self.pool, collection, id, &serde_json::to_value(patch)?).await
    }

    /// Insert under a generated id and return it.
    pub async fn add<T: Serialize>(&self, collection: Collection, data: &T) -> AppResult<String> {
        let id = Uuid::now_v7().to_string();
        insert_doc(&self.pool, collection, &id, &serde_json::to_value(data)?).await?;
        Ok(id)
    }
}

fn rows_to_docs(rows: Vec<(String, String)>) -> AppResult<Vec<Document>> {
    rows.into_iter()
        .map(|(id, data)| {
            let data = serde_json::from_str(&data)?;
            Ok(Document { id, data })
        })
        .collect()
}

fn decode_all<T: DeserializeOwned>(
    docs: Vec<Document>,
    collection: Collection,
) -> AppResult<Vec<T>> {
    docs.iter().map(|doc| doc.decode(collection)).collect()
}

pub(crate) async fn fetch_doc<'e, E>(
    exec: E,
    collection: Collection,
    id: &str,
) -> AppResult<Option<Document>>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let sql = format!("SELECT data FROM {} WHERE id = ?", collection.table());
    let row: Option<(String,)> = sqlx::query_as(&sql).bind(id).fetch_optional(exec).await?;
    match row {
        Some((data,)) => Ok(Some(Document {
            id: id.to_owned(),
            data: serde_json::from_str(&data)?,
        })),
        None => Ok(None),
    }
}

pub(crate) async fn insert_doc<'e, E>(
    exec: E,
    collection: Collection,
    id: &str,
    data: &Value,
) -> AppResult<()>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let sql = format!("INSERT INTO {} (id, data) VALUES (?, ?)", collection.table());
    sqlx::query(&sql)
        .bind(id)
        .bind(data.to_string())
        .execute(exec)
        .await?;
    Ok(())
}

pub(crate) async fn upsert_doc<'e, E>(
    exec: E,
    collection: Collection,
    id: &str,
    data: &Value,
) -> AppResult<()>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let sql = format!(
        "INSERT INTO {} (id, data) VALUES (?, ?) ON CONFLICT(id) DO UPDATE SET data = excluded.data",
        collection.table()
    );
    sqlx::query(&sql)
        .bind(id)
        .bind(data.to_string())
        .execute(exec)
        .await?;
    Ok(())
}

pub(crate) async fn patch_doc<'e, E>(
    exec: E,
    collection: Collection,
    id: &str,
    patch: &Value,
) -> AppResult<()>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let sql = format!(
        "UPDATE {} SET data = json_patch(data, ?) WHERE id = ?",
        collection.table()
    );
    let result = sqlx::query(&sql)
        .bind(patch.to_string())
        .bind(id)
        .execute(exec)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(collection.table()));
    }
    Ok(())
}

pub(crate) async fn delete_doc<'e, E>(exec: E, collection: Collection, id: &str) -> AppResult<bool>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let sql = format!("DELETE FROM {} WHERE id = ?", collection.table());
    let result = sqlx::query(&sql).bind(id).execute(exec).await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
pub(crate) async fn memory_store() -> DocStore {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let store = DocStore::new(pool);
    store.migrate().await.unwrap();
    store
}
