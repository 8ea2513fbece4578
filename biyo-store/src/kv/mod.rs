//! Key-value backends: each table is one JSON array under one key.

mod file;
mod memory;
mod rest;

pub use file::FileKv;
pub use memory::MemoryKv;
pub use rest::RestKv;

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::store::{
    record_id, retain_unmatched, upsert_rows, RowPredicate, RowUpdate, TableStore, UpsertOutcome,
};
use crate::table::Table;

pub const DEFAULT_KEY_PREFIX: &str = "biyo";

/// Minimal get/set contract of a JSON key-value service.
#[async_trait]
pub trait KvBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn get(&self, key: &str) -> StoreResult<Option<Value>>;

    async fn set(&self, key: &str, value: &Value) -> StoreResult<()>;
}

pub struct KvTableStore<B> {
    backend: B,
    prefix: String,
    locks: HashMap<Table, Mutex<()>>,
}

impl<B: KvBackend> KvTableStore<B> {
    pub fn new(backend: B) -> Self {
        Self::with_prefix(backend, DEFAULT_KEY_PREFIX)
    }

    pub fn with_prefix(backend: B, prefix: impl Into<String>) -> Self {
        Self {
            backend,
            prefix: prefix.into(),
            locks: Table::ALL.into_iter().map(|t| (t, Mutex::new(()))).collect(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn key(&self, table: Table) -> String {
        table.kv_key(&self.prefix)
    }

    async fn read_rows(&self, key: &str) -> StoreResult<Vec<Value>> {
        match self.backend.get(key).await? {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(rows)) => Ok(rows),
            Some(_) => Err(StoreError::CorruptTable { key: key.to_string() }),
        }
    }

    async fn write_rows(&self, key: &str, rows: Vec<Value>) -> StoreResult<()> {
        self.backend.set(key, &Value::Array(rows)).await
    }
}

#[async_trait]
impl<B: KvBackend> TableStore for KvTableStore<B> {
    fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    async fn load(&self, table: Table) -> StoreResult<Vec<Value>> {
        self.read_rows(&self.key(table)).await
    }

    async fn upsert(&self, table: Table, item: Value) -> StoreResult<Value> {
        let key = self.key(table);
        let _guard = self.locks[&table].lock().await;

        let mut rows = self.read_rows(&key).await?;
        let outcome = upsert_rows(&mut rows, item.clone())?;
        self.write_rows(&key, rows).await?;

        debug!(%key, inserted = outcome == UpsertOutcome::Inserted, "kv upsert");
        Ok(item)
    }

    async fn delete_where(&self, table: Table, predicate: RowPredicate<'_>) -> StoreResult<usize> {
        let key = self.key(table);
        let _guard = self.locks[&table].lock().await;

        let mut rows = self.read_rows(&key).await?;
        let removed = retain_unmatched(&mut rows, predicate);
        if removed > 0 {
            self.write_rows(&key, rows).await?;
        }

        debug!(%key, removed, "kv delete");
        Ok(removed)
    }

    async fn update(
        &self,
        table: Table,
        predicate: RowPredicate<'_>,
        apply: RowUpdate<'_>,
    ) -> StoreResult<Option<Value>> {
        let key = self.key(table);
        let _guard = self.locks[&table].lock().await;

        let mut rows = self.read_rows(&key).await?;
        let Some(idx) = rows.iter().position(|r| predicate(r)) else {
            return Ok(None);
        };
        let updated = apply(std::mem::take(&mut rows[idx]))?;
        record_id(&updated)?;
        rows[idx] = updated.clone();
        self.write_rows(&key, rows).await?;

        debug!(%key, row = idx, "kv update");
        Ok(Some(updated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{str_field, Repository};
    use serde_json::json;
    use std::sync::Arc;

    fn store() -> Arc<KvTableStore<MemoryKv>> {
        Arc::new(KvTableStore::new(MemoryKv::new()))
    }

    #[tokio::test]
    async fn upsert_then_list() {
        let s = store();
        let repo = Repository::new(s.clone(), Table::Doctors);

        repo.upsert(json!({"id": "d1", "clinicId": "a", "name": "Aliya"})).await.unwrap();
        repo.upsert(json!({"id": "d2", "clinicId": "b", "name": "Bek"})).await.unwrap();
        repo.upsert(json!({"id": "d1", "clinicId": "a", "name": "Aliya K."})).await.unwrap();

        let all = repo.list(|_| true).await;
        assert_eq!(all.len(), 2);
        assert_eq!(all[0]["name"], "Aliya K.");

        let only_a = repo.list(|r| str_field(r, "clinicId") == Some("a")).await;
        assert_eq!(only_a.len(), 1);

        let raw = s.backend().get("biyo:doctors").await.unwrap().unwrap();
        assert_eq!(raw.as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn delete_where_only_touches_matches() {
        let s = store();
        s.backend()
            .set(
                "biyo:visits",
                &json!([
                    {"id": "v1", "clinicId": "a"},
                    {"id": "v1", "clinicId": "b"},
                    {"id": "v2", "clinicId": "a"}
                ]),
            )
            .await
            .unwrap();

        let repo = Repository::new(s, Table::Visits);
        let removed = repo
            .delete_where(|r| str_field(r, "id") == Some("v1") && str_field(r, "clinicId") == Some("a"))
            .await
            .unwrap();
        assert_eq!(removed, 1);

        let left = repo.list(|_| true).await;
        assert_eq!(left.len(), 2);
        assert!(left.iter().any(|r| r["id"] == "v1" && r["clinicId"] == "b"));

        let none = repo.delete_where(|r| str_field(r, "id") == Some("zzz")).await.unwrap();
        assert_eq!(none, 0);
    }

    #[tokio::test]
    async fn corrupt_table_is_an_error_for_writes_and_empty_for_lists() {
        let s = store();
        s.backend().set("biyo:patients", &json!({"oops": true})).await.unwrap();

        let repo = Repository::new(s.clone(), Table::Patients);
        assert!(repo.list(|_| true).await.is_empty());
        assert!(repo.upsert(json!({"id": "p1"})).await.is_err());
        assert!(repo.find_by_id("p1").await.is_err());
    }

    #[tokio::test]
    async fn concurrent_updates_of_one_record_all_land() {
        let s = store();
        let repo = Repository::new(s, Table::Visits);
        repo.upsert(json!({"id": "v1", "payments": []})).await.unwrap();

        let writers = (0..20).map(|n| {
            let repo = repo.clone();
            tokio::spawn(async move {
                repo.update(
                    |r| str_field(r, "id") == Some("v1"),
                    move |mut visit| {
                        if let Some(list) = visit["payments"].as_array_mut() {
                            list.push(json!({ "id": format!("pay_{n}") }));
                        }
                        Ok(visit)
                    },
                )
                .await
                .unwrap()
            })
        });
        for w in writers.collect::<Vec<_>>() {
            assert!(w.await.unwrap().is_some());
        }

        let visit = repo.find_by_id("v1").await.unwrap().unwrap();
        assert_eq!(visit["payments"].as_array().map(Vec::len), Some(20));
    }

    #[tokio::test]
    async fn update_without_a_match_or_with_a_failing_edit_writes_nothing() {
        let s = store();
        let repo = Repository::new(s, Table::Visits);
        repo.upsert(json!({"id": "v1", "cost": 10})).await.unwrap();

        let missing = repo.update(|r| str_field(r, "id") == Some("v9"), Ok).await.unwrap();
        assert!(missing.is_none());

        let failed = repo
            .update(|r| str_field(r, "id") == Some("v1"), |_| Err(StoreError::invalid("no")))
            .await;
        assert!(failed.is_err());
        assert_eq!(repo.find_by_id("v1").await.unwrap().unwrap()["cost"], 10);
    }

    #[tokio::test]
    async fn custom_prefix_changes_keys() {
        let s = KvTableStore::with_prefix(MemoryKv::new(), "demo");
        s.upsert(Table::Clinics, json!({"id": "c1"})).await.unwrap();
        assert!(s.backend().get("demo:clinics").await.unwrap().is_some());
        assert!(s.backend().get("biyo:clinics").await.unwrap().is_none());
    }
}
