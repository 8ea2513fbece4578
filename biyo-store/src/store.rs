use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use crate::error::{StoreError, StoreResult};
use crate::table::Table;

pub type RowPredicate<'a> = &'a (dyn Fn(&Value) -> bool + Send + Sync);

/// Turns a stored record into its replacement.
pub type RowUpdate<'a> = Box<dyn FnOnce(Value) -> StoreResult<Value> + Send + 'a>;

/// Whole-table storage of JSON records.
///
/// `upsert`, `update` and `delete_where` are read-modify-write cycles. Implementations
/// serialize them per table within one process; concurrent writers in other
/// processes can still overwrite each other.
#[async_trait]
pub trait TableStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    async fn load(&self, table: Table) -> StoreResult<Vec<Value>>;

    /// Replace the record with the same `id`, or append it.
    async fn upsert(&self, table: Table, item: Value) -> StoreResult<Value>;

    /// Remove every record matching `predicate`; returns how many went.
    async fn delete_where(&self, table: Table, predicate: RowPredicate<'_>) -> StoreResult<usize>;

    /// Rewrite the first record matching `predicate` through `apply` in one
    /// locked cycle. `None` when nothing matched; an error from `apply`
    /// leaves the table as it was.
    async fn update(
        &self,
        table: Table,
        predicate: RowPredicate<'_>,
        apply: RowUpdate<'_>,
    ) -> StoreResult<Option<Value>>;
}

/// The record's `id`, which must be a non-empty string.
pub fn record_id(item: &Value) -> StoreResult<&str> {
    if !item.is_object() {
        return Err(StoreError::invalid("record must be a JSON object"));
    }
    item.get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| StoreError::invalid("record must carry a non-empty string id"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Replaced(usize),
}

/// Upsert `item` into an in-memory table, keeping row order.
pub fn upsert_rows(rows: &mut Vec<Value>, item: Value) -> StoreResult<UpsertOutcome> {
    let id = record_id(&item)?.to_string();
    match rows
        .iter()
        .position(|r| r.get("id").and_then(Value::as_str) == Some(id.as_str()))
    {
        Some(idx) => {
            rows[idx] = item;
            Ok(UpsertOutcome::Replaced(idx))
        }
        None => {
            rows.push(item);
            Ok(UpsertOutcome::Inserted)
        }
    }
}

/// Drop matching rows in place; returns how many were removed.
pub fn retain_unmatched(rows: &mut Vec<Value>, predicate: RowPredicate<'_>) -> usize {
    let before = rows.len();
    rows.retain(|r| !predicate(r));
    before - rows.len()
}

pub fn str_field<'a>(record: &'a Value, key: &str) -> Option<&'a str> {
    record.get(key).and_then(Value::as_str)
}

/// A store bound to one table.
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn TableStore>,
    table: Table,
}

impl Repository {
    pub fn new(store: Arc<dyn TableStore>, table: Table) -> Self {
        Self { store, table }
    }

    pub fn table(&self) -> Table {
        self.table
    }

    pub fn store(&self) -> &Arc<dyn TableStore> {
        &self.store
    }

    /// Records matching `filter`. A failed read is logged and yields an
    /// empty list, so list views degrade instead of erroring.
    pub async fn list<F>(&self, filter: F) -> Vec<Value>
    where
        F: Fn(&Value) -> bool,
    {
        match self.try_list(filter).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(
                    table = %self.table,
                    backend = self.store.backend_name(),
                    error = %e,
                    "table read failed, returning empty list"
                );
                Vec::new()
            }
        }
    }

    pub async fn try_list<F>(&self, filter: F) -> StoreResult<Vec<Value>>
    where
        F: Fn(&Value) -> bool,
    {
        let rows = self.store.load(self.table).await?;
        Ok(rows.into_iter().filter(|r| filter(r)).collect())
    }

    /// First record matching `predicate`. Read failures propagate.
    pub async fn find<F>(&self, predicate: F) -> StoreResult<Option<Value>>
    where
        F: Fn(&Value) -> bool,
    {
        let rows = self.store.load(self.table).await?;
        Ok(rows.into_iter().find(|r| predicate(r)))
    }

    pub async fn find_by_id(&self, id: &str) -> StoreResult<Option<Value>> {
        self.find(|r| str_field(r, "id") == Some(id)).await
    }

    pub async fn upsert(&self, item: Value) -> StoreResult<Value> {
        self.store.upsert(self.table, item).await
    }

    pub async fn update<F, U>(&self, predicate: F, apply: U) -> StoreResult<Option<Value>>
    where
        F: Fn(&Value) -> bool + Send + Sync,
        U: FnOnce(Value) -> StoreResult<Value> + Send,
    {
        self.store.update(self.table, &predicate, Box::new(apply)).await
    }

    pub async fn delete_where<F>(&self, predicate: F) -> StoreResult<usize>
    where
        F: Fn(&Value) -> bool + Send + Sync,
    {
        self.store.delete_where(self.table, &predicate).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn upsert_appends_then_replaces_in_place() {
        let mut rows = vec![json!({"id": "a", "n": 1}), json!({"id": "b", "n": 2})];

        let out = upsert_rows(&mut rows, json!({"id": "c", "n": 3})).unwrap();
        assert_eq!(out, UpsertOutcome::Inserted);
        assert_eq!(rows.len(), 3);

        let out = upsert_rows(&mut rows, json!({"id": "a", "n": 10})).unwrap();
        assert_eq!(out, UpsertOutcome::Replaced(0));
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["n"], 10);
    }

    #[test]
    fn upsert_rejects_records_without_id() {
        let mut rows = Vec::new();
        assert!(upsert_rows(&mut rows, json!({"name": "x"})).is_err());
        assert!(upsert_rows(&mut rows, json!({"id": ""})).is_err());
        assert!(upsert_rows(&mut rows, json!(["id"])).is_err());
        assert!(rows.is_empty());
    }

    #[test]
    fn retain_unmatched_counts_removed_rows() {
        let mut rows = vec![
            json!({"id": "1", "clinicId": "a"}),
            json!({"id": "1", "clinicId": "b"}),
            json!({"id": "2", "clinicId": "a"}),
        ];
        let removed = retain_unmatched(&mut rows, &|r: &Value| {
            str_field(r, "id") == Some("1") && str_field(r, "clinicId") == Some("a")
        });
        assert_eq!(removed, 1);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().any(|r| r["clinicId"] == "b"));
    }
}
