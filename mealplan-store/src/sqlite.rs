//! SQLite-backed document database
//!
//! One `documents` table keyed by (collection, id) holds each document's
//! fields as JSON. Batches run in a single transaction; change notices are
//! published only after the transaction commits.
//!
//! Commits are serialized through a writer lock, so a read-then-write
//! transaction never meets a concurrent commit (SQLITE_BUSY_SNAPSHOT).

use crate::database::{announce_commit, apply_set, DocumentDatabase, Query, WriteBatch, WriteOp};
use async_trait::async_trait;
use mealplan_common::events::{EventBus, MealPlanEvent};
use mealplan_common::{Document, Fields, Result};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use std::path::Path;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

pub struct SqliteDatabase {
    pool: SqlitePool,
    event_bus: EventBus,
    writer: Mutex<()>,
}

impl SqliteDatabase {
    /// Open (creating if needed) the database file at `db_path`
    pub async fn open(db_path: &Path, event_bus: EventBus) -> Result<Self> {
        let newly_created = !db_path.exists();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await?;

        if newly_created {
            info!("Initialized new database: {}", db_path.display());
        } else {
            info!("Opened existing database: {}", db_path.display());
        }

        sqlx::query("PRAGMA journal_mode = WAL")
            .execute(&pool)
            .await?;
        sqlx::query("PRAGMA busy_timeout = 5000")
            .execute(&pool)
            .await?;

        create_documents_table(&pool).await?;
        Ok(Self {
            pool,
            event_bus,
            writer: Mutex::new(()),
        })
    }

    /// Private in-memory database; a single connection keeps one shared schema
    pub async fn in_memory(event_bus: EventBus) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        create_documents_table(&pool).await?;
        Ok(Self {
            pool,
            event_bus,
            writer: Mutex::new(()),
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Create the documents table if it does not exist
pub async fn create_documents_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            fields TEXT NOT NULL,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (collection, id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

fn decode_fields(collection: &str, id: &str, raw: &str) -> Option<Fields> {
    match serde_json::from_str(raw) {
        Ok(fields) => Some(fields),
        Err(e) => {
            warn!("Skipping unreadable document {}/{}: {}", collection, id, e);
            None
        }
    }
}

#[async_trait]
impl DocumentDatabase for SqliteDatabase {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let raw: Option<String> =
            sqlx::query_scalar("SELECT fields FROM documents WHERE collection = ? AND id = ?")
                .bind(collection)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(raw
            .and_then(|raw| decode_fields(collection, id, &raw))
            .map(|fields| Document::new(id, fields)))
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>> {
        let rows = sqlx::query("SELECT id, fields FROM documents WHERE collection = ?")
            .bind(&query.collection)
            .fetch_all(&self.pool)
            .await?;

        let docs = rows
            .iter()
            .filter_map(|row| {
                let id: String = row.get("id");
                let raw: String = row.get("fields");
                decode_fields(&query.collection, &id, &raw).map(|fields| Document::new(id, fields))
            })
            .collect();

        Ok(query.apply(docs))
    }

    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let touched = batch.touched_collections();
        let writer = self.writer.lock().await;
        let mut tx = self.pool.begin().await?;

        for op in batch.into_ops() {
            match op {
                WriteOp::Set {
                    collection,
                    id,
                    fields,
                    mode,
                } => {
                    let existing: Option<String> = sqlx::query_scalar(
                        "SELECT fields FROM documents WHERE collection = ? AND id = ?",
                    )
                    .bind(&collection)
                    .bind(&id)
                    .fetch_optional(&mut *tx)
                    .await?;
                    let existing = existing.and_then(|raw| decode_fields(&collection, &id, &raw));
                    let stored = serde_json::to_string(&apply_set(existing, fields, mode))?;

                    sqlx::query(
                        r#"
                        INSERT INTO documents (collection, id, fields, updated_at)
                        VALUES (?, ?, ?, CURRENT_TIMESTAMP)
                        ON CONFLICT (collection, id)
                        DO UPDATE SET fields = excluded.fields, updated_at = CURRENT_TIMESTAMP
                        "#,
                    )
                    .bind(&collection)
                    .bind(&id)
                    .bind(&stored)
                    .execute(&mut *tx)
                    .await?;
                }
                WriteOp::Delete { collection, id } => {
                    sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
                        .bind(&collection)
                        .bind(&id)
                        .execute(&mut *tx)
                        .await?;
                }
            }
        }

        tx.commit().await?;
        drop(writer);
        debug!("Committed batch touching {} collection(s)", touched.len());
        announce_commit(&self.event_bus, touched);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<MealPlanEvent> {
        self.event_bus.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::SetMode;
    use mealplan_common::Value;

    #[tokio::test]
    async fn test_in_memory_merge_and_query() {
        let db = SqliteDatabase::in_memory(EventBus::new(16)).await.unwrap();

        let mut first = Fields::new();
        first.insert("name".to_string(), "Milk".into());
        first.insert("category".to_string(), "Dairy & Eggs".into());
        db.set("g", "milk", first, SetMode::Overwrite).await.unwrap();

        let mut update = Fields::new();
        update.insert("isChecked".to_string(), Value::Boolean(true));
        db.set("g", "milk", update, SetMode::Merge).await.unwrap();

        let docs = db
            .query(&Query::collection("g").where_eq("isChecked", true))
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(
            docs[0].get("category").and_then(Value::as_str),
            Some("Dairy & Eggs")
        );
    }

    #[tokio::test]
    async fn test_unreadable_row_is_skipped() {
        let db = SqliteDatabase::in_memory(EventBus::new(16)).await.unwrap();
        sqlx::query("INSERT INTO documents (collection, id, fields) VALUES ('g', 'bad', 'not json')")
            .execute(db.pool())
            .await
            .unwrap();
        db.set("g", "ok", Fields::new(), SetMode::Overwrite).await.unwrap();

        let docs = db.query(&Query::collection("g")).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "ok");
    }
}
