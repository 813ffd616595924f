//! Live query listeners
//!
//! A listener runs its query once, then again every time the database
//! announces a change to the queried collection. Each run decodes the
//! result and hands the full list to `on_update`. A failed query reports
//! through `on_error` and ends the listener.

use crate::database::{DocumentDatabase, Query};
use mealplan_common::events::MealPlanEvent;
use mealplan_common::Document;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Handle to a running listener
///
/// Dropping the registration cancels the listener.
pub struct ListenerRegistration {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
    collection: String,
}

impl ListenerRegistration {
    /// Collection path this listener watches
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Stop delivering callbacks without waiting for the task to exit
    pub fn remove(&self) {
        self.cancel.cancel();
    }

    /// Cancel and wait until the listener task has exited
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }

    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled()
            && self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for ListenerRegistration {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Spawn a listener for `query`
///
/// `label` names the collection in error messages ("Failed to load <label>").
/// Documents `decode` rejects are dropped from the delivered list.
pub fn spawn_listener<T, D, U, E>(
    db: Arc<dyn DocumentDatabase>,
    query: Query,
    label: &'static str,
    cancel: CancellationToken,
    decode: D,
    on_update: U,
    on_error: E,
) -> ListenerRegistration
where
    T: Send + 'static,
    D: Fn(&Document) -> Option<T> + Send + Sync + 'static,
    U: Fn(Vec<T>) + Send + Sync + 'static,
    E: Fn(String) + Send + Sync + 'static,
{
    let collection = query.collection.clone();
    let token = cancel.clone();

    let handle = tokio::spawn(async move {
        // Subscribe before the first query so no change can slip in between
        let mut changes = db.subscribe();

        if !refresh(&*db, &query, label, &token, &decode, &on_update, &on_error).await {
            return;
        }

        loop {
            tokio::select! {
                biased;

                _ = token.cancelled() => break,

                notice = changes.recv() => {
                    let rerun = match notice {
                        Ok(MealPlanEvent::CollectionChanged { collection, .. }) => {
                            collection == query.collection
                        }
                        Ok(_) => false,
                        Err(RecvError::Lagged(skipped)) => {
                            debug!("Listener on {} lagged by {} notice(s)", query.collection, skipped);
                            true
                        }
                        Err(RecvError::Closed) => break,
                    };

                    if rerun
                        && !refresh(&*db, &query, label, &token, &decode, &on_update, &on_error).await
                    {
                        break;
                    }
                }
            }
        }

        debug!("Listener on {} stopped", query.collection);
    });

    ListenerRegistration {
        cancel,
        handle: Some(handle),
        collection,
    }
}

/// Run the query once and deliver the outcome; false ends the listener
async fn refresh<T, D, U, E>(
    db: &dyn DocumentDatabase,
    query: &Query,
    label: &str,
    token: &CancellationToken,
    decode: &D,
    on_update: &U,
    on_error: &E,
) -> bool
where
    D: Fn(&Document) -> Option<T>,
    U: Fn(Vec<T>),
    E: Fn(String),
{
    match db.query(query).await {
        Ok(docs) => {
            let items: Vec<T> = docs.iter().filter_map(decode).collect();
            if items.len() < docs.len() {
                debug!(
                    "Dropped {} undecodable document(s) from {}",
                    docs.len() - items.len(),
                    query.collection
                );
            }
            if token.is_cancelled() {
                return false;
            }
            on_update(items);
            true
        }
        Err(e) => {
            if !token.is_cancelled() {
                on_error(format!("Failed to load {}: {}", label, e));
            }
            false
        }
    }
}
