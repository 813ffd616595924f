//! Document database contract
//!
//! The meal planner talks to its database through [`DocumentDatabase`]:
//! documents addressed by (collection path, id), simple queries, atomic
//! multi-document batches, and a change-notice stream that live listeners
//! use to know when to re-run their query.
//!
//! Query evaluation ([`Query::apply`]) and write application
//! ([`apply_set`]) are shared so every backend filters, orders and merges
//! identically.

use async_trait::async_trait;
use mealplan_common::events::{EventBus, MealPlanEvent};
use mealplan_common::{Document, Fields, Result, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tokio::sync::broadcast;

/// How a set operation treats an existing document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetMode {
    /// Replace the whole document
    Overwrite,
    /// Update only the given top-level fields, keep the rest
    Merge,
}

/// A single write inside a batch
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Set {
        collection: String,
        id: String,
        fields: Fields,
        mode: SetMode,
    },
    /// Deleting a missing document is not an error
    Delete { collection: String, id: String },
}

impl WriteOp {
    pub fn collection(&self) -> &str {
        match self {
            WriteOp::Set { collection, .. } | WriteOp::Delete { collection, .. } => collection,
        }
    }
}

/// A set of writes committed as one atomic unit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(
        &mut self,
        collection: impl Into<String>,
        id: impl Into<String>,
        fields: Fields,
        mode: SetMode,
    ) -> &mut Self {
        self.ops.push(WriteOp::Set {
            collection: collection.into(),
            id: id.into(),
            fields,
            mode,
        });
        self
    }

    pub fn delete(&mut self, collection: impl Into<String>, id: impl Into<String>) -> &mut Self {
        self.ops.push(WriteOp::Delete {
            collection: collection.into(),
            id: id.into(),
        });
        self
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Documents touched per collection, for change notices
    pub fn touched_collections(&self) -> BTreeMap<String, usize> {
        let mut touched = BTreeMap::new();
        for op in &self.ops {
            *touched.entry(op.collection().to_string()).or_insert(0) += 1;
        }
        touched
    }
}

/// Publish one change notice per collection touched by a committed batch
pub(crate) fn announce_commit(event_bus: &EventBus, touched: BTreeMap<String, usize>) {
    let timestamp = chrono::Utc::now();
    for (collection, documents) in touched {
        event_bus.emit_lossy(MealPlanEvent::CollectionChanged {
            collection,
            documents,
            timestamp,
        });
    }
}

/// Compute the stored fields after a set
pub fn apply_set(existing: Option<Fields>, fields: Fields, mode: SetMode) -> Fields {
    match (mode, existing) {
        (SetMode::Merge, Some(mut current)) => {
            current.extend(fields);
            current
        }
        _ => fields,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Equal,
    GreaterOrEqual,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    fn matches(&self, doc: &Document) -> bool {
        let Some(actual) = doc.get(&self.field) else {
            return false;
        };
        match (self.op, actual.compare(&self.value)) {
            (FilterOp::Equal, Some(Ordering::Equal)) => true,
            (FilterOp::GreaterOrEqual, Some(Ordering::Equal | Ordering::Greater)) => true,
            _ => false,
        }
    }
}

/// A query over one collection
///
/// Documents lacking the order-by field are excluded from ordered results.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<Filter>,
    pub order_by: Option<(String, Direction)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn collection(path: impl Into<String>) -> Self {
        Self {
            collection: path.into(),
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            op: FilterOp::Equal,
            value: value.into(),
        });
        self
    }

    pub fn where_ge(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            op: FilterOp::GreaterOrEqual,
            value: value.into(),
        });
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.filters.iter().all(|filter| filter.matches(doc))
    }

    /// Filter, order and limit the documents of `self.collection`
    pub fn apply(&self, docs: Vec<Document>) -> Vec<Document> {
        let mut matched: Vec<Document> = docs.into_iter().filter(|doc| self.matches(doc)).collect();

        if let Some((field, direction)) = &self.order_by {
            matched.retain(|doc| doc.get(field).is_some());
            matched.sort_by(|a, b| {
                let ordering = match (a.get(field), b.get(field)) {
                    (Some(x), Some(y)) => x.compare(y).unwrap_or(Ordering::Equal),
                    _ => Ordering::Equal,
                };
                let ordering = match direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                };
                ordering.then_with(|| a.id.cmp(&b.id))
            });
        }

        if let Some(limit) = self.limit {
            matched.truncate(limit);
        }
        matched
    }
}

/// The hosted document database
///
/// Writes are last-write-wins. A successful commit must be followed by one
/// `MealPlanEvent::CollectionChanged` per touched collection on the stream
/// returned by [`subscribe`](DocumentDatabase::subscribe).
#[async_trait]
pub trait DocumentDatabase: Send + Sync {
    /// Read a single document
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Run a query
    async fn query(&self, query: &Query) -> Result<Vec<Document>>;

    /// Apply every write in `batch` atomically
    async fn commit(&self, batch: WriteBatch) -> Result<()>;

    /// Change notices for all collections
    fn subscribe(&self) -> broadcast::Receiver<MealPlanEvent>;

    async fn set(&self, collection: &str, id: &str, fields: Fields, mode: SetMode) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.set(collection, id, fields, mode);
        self.commit(batch).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.delete(collection, id);
        self.commit(batch).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, pairs: &[(&str, Value)]) -> Document {
        Document::new(
            id,
            pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
        )
    }

    #[test]
    fn test_merge_keeps_untouched_fields() {
        let existing = doc("milk", &[("name", "Milk".into()), ("category", "Dairy & Eggs".into())]);
        let update: Fields = [("isChecked".to_string(), Value::Boolean(false))].into();

        let merged = apply_set(Some(existing.fields.clone()), update.clone(), SetMode::Merge);
        assert_eq!(merged.get("category"), Some(&Value::from("Dairy & Eggs")));
        assert_eq!(merged.get("isChecked"), Some(&Value::Boolean(false)));

        let replaced = apply_set(Some(existing.fields), update, SetMode::Overwrite);
        assert!(!replaced.contains_key("category"));
    }

    #[test]
    fn test_query_filters_orders_and_limits() {
        let docs = vec![
            doc("a", &[("n", Value::Integer(3)), ("checked", true.into())]),
            doc("b", &[("n", Value::Integer(1)), ("checked", true.into())]),
            doc("c", &[("n", Value::Integer(2)), ("checked", false.into())]),
            doc("d", &[("checked", true.into())]),
        ];

        let query = Query::collection("x")
            .where_eq("checked", true)
            .order_by("n", Direction::Descending)
            .limit(5);
        let ids: Vec<_> = query.apply(docs).into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_query_ge_filter_with_limit() {
        let docs = vec![
            doc("old", &[("n", Value::Integer(1))]),
            doc("new", &[("n", Value::Integer(5))]),
            doc("newer", &[("n", Value::Integer(9))]),
        ];
        let query = Query::collection("x")
            .where_ge("n", Value::Integer(5))
            .order_by("n", Direction::Ascending)
            .limit(1);
        let result = query.apply(docs);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "new");
    }

    #[test]
    fn test_filter_on_mismatched_type_does_not_match() {
        let docs = vec![doc("a", &[("checked", "true".into())])];
        assert!(Query::collection("x").where_eq("checked", true).apply(docs).is_empty());
    }

    #[test]
    fn test_touched_collections_counts_ops() {
        let mut batch = WriteBatch::new();
        batch
            .set("u/groceries", "milk", Fields::new(), SetMode::Merge)
            .set("u/groceries", "eggs", Fields::new(), SetMode::Merge)
            .delete("u/recipes", "stew");
        let touched = batch.touched_collections();
        assert_eq!(touched.get("u/groceries"), Some(&2));
        assert_eq!(touched.get("u/recipes"), Some(&1));
    }
}
