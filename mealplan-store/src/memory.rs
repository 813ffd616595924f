//! Process-local document database
//!
//! Used by tests and by `mealplan --ephemeral`. Supports fault injection so
//! callers can exercise write failures and permission-denied listeners.

use crate::database::{announce_commit, apply_set, DocumentDatabase, Query, WriteBatch, WriteOp};
use async_trait::async_trait;
use mealplan_common::events::{EventBus, MealPlanEvent};
use mealplan_common::{Document, Error, Fields, Result};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

type Collections = HashMap<String, BTreeMap<String, Fields>>;

pub struct MemoryDatabase {
    collections: RwLock<Collections>,
    event_bus: EventBus,
    fail_writes: AtomicBool,
    deny_reads: AtomicBool,
}

impl MemoryDatabase {
    pub fn new(event_bus: EventBus) -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            event_bus,
            fail_writes: AtomicBool::new(false),
            deny_reads: AtomicBool::new(false),
        }
    }

    /// Make every following commit fail
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every following read fail as if permission were denied
    pub fn set_deny_reads(&self, deny: bool) {
        self.deny_reads.store(deny, Ordering::SeqCst);
    }

    /// Number of documents stored in `collection`
    pub async fn document_count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    fn check_read(&self) -> Result<()> {
        if self.deny_reads.load(Ordering::SeqCst) {
            return Err(Error::Store("permission denied".to_string()));
        }
        Ok(())
    }
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::new(EventBus::default())
    }
}

#[async_trait]
impl DocumentDatabase for MemoryDatabase {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        self.check_read()?;
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|fields| Document::new(id, fields.clone())))
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>> {
        self.check_read()?;
        let docs = {
            let collections = self.collections.read().await;
            collections
                .get(&query.collection)
                .map(|docs| {
                    docs.iter()
                        .map(|(id, fields)| Document::new(id.as_str(), fields.clone()))
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default()
        };
        Ok(query.apply(docs))
    }

    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Store("the service is currently unavailable".to_string()));
        }
        if batch.is_empty() {
            return Ok(());
        }

        let touched = batch.touched_collections();
        {
            let mut collections = self.collections.write().await;
            for op in batch.into_ops() {
                match op {
                    WriteOp::Set {
                        collection,
                        id,
                        fields,
                        mode,
                    } => {
                        let docs = collections.entry(collection).or_default();
                        let merged = apply_set(docs.remove(&id), fields, mode);
                        docs.insert(id, merged);
                    }
                    WriteOp::Delete { collection, id } => {
                        if let Some(docs) = collections.get_mut(&collection) {
                            docs.remove(&id);
                        }
                    }
                }
            }
        }

        debug!("Committed batch touching {} collection(s)", touched.len());
        announce_commit(&self.event_bus, touched);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<MealPlanEvent> {
        self.event_bus.subscribe()
    }
}
