//! Clinic-scoped CRUD over one table of JSON records.

use anyhow::Result;
use biyo_core::errors::BiyoError;
use biyo_core::tenant::TenantContext;
use biyo_core::ServiceCapabilities;
use biyo_model::new_id;
use biyo_store::{Repository, StoreError};
use serde_json::{json, Map, Value};

use crate::services::ClinicParams;

/// Store failures as client errors: upstream problems are 502, bad records
/// 400, everything else 500.
pub fn store_error(e: StoreError) -> anyhow::Error {
    let err = match &e {
        StoreError::InvalidRecord { message } => BiyoError::bad_request(message.clone()),
        e if e.is_upstream() => BiyoError::bad_gateway(e.to_string()),
        e => BiyoError::general_error(e.to_string()),
    };
    err.with_source(e.into()).into_anyhow()
}

pub fn str_of<'a>(record: &'a Value, key: &str) -> Option<&'a str> {
    record.get(key).and_then(Value::as_str)
}

pub struct TableAdapter {
    pub repo: Repository,
    pub id_prefix: &'static str,
    pub not_found_prefix: &'static str,
    /// Query keys that filter `find` by equality with the record field.
    pub filters: &'static [&'static str],
    /// Records carry a `clinicId` and are only visible to that clinic.
    pub clinic_scoped: bool,
    pub capabilities: ServiceCapabilities,
}

impl TableAdapter {
    fn admits(&self, ctx: &TenantContext, record: &Value) -> bool {
        !self.clinic_scoped || ctx.admits(str_of(record, "clinicId"))
    }

    fn not_found(&self, id: &str) -> anyhow::Error {
        BiyoError::not_found(format!("{}: {id}", self.not_found_prefix)).into_anyhow()
    }

    pub async fn _find(&self, ctx: &TenantContext, params: ClinicParams) -> Result<Vec<Value>> {
        let wanted: Vec<(&str, &str)> = self
            .filters
            .iter()
            .filter_map(|key| params.query_value(key).map(|v| (*key, v)))
            .collect();

        Ok(self
            .repo
            .list(|r| {
                self.admits(ctx, r) && wanted.iter().all(|(k, v)| str_of(r, k) == Some(*v))
            })
            .await)
    }

    pub async fn _get(&self, ctx: &TenantContext, id: &str, _params: ClinicParams) -> Result<Value> {
        self.repo
            .find_by_id(id)
            .await
            .map_err(store_error)?
            .filter(|r| self.admits(ctx, r))
            .ok_or_else(|| self.not_found(id))
    }

    /// Insert or replace by `id`, assigning `{prefix}_…` when the body has
    /// none.
    pub async fn _create(&self, ctx: &TenantContext, data: Value, _params: ClinicParams) -> Result<Value> {
        let Value::Object(mut obj) = data else {
            return Err(BiyoError::bad_request("Request body must be a JSON object").into_anyhow());
        };
        ensure_id(&mut obj, self.id_prefix);
        if self.clinic_scoped {
            stamp_clinic(&mut obj, ctx);
        }

        self.repo
            .upsert(Value::Object(obj))
            .await
            .map_err(store_error)
    }

    /// Delete by `(id, clinicId)`; both are required. Answers success even
    /// when nothing matched.
    pub async fn _remove(&self, ctx: &TenantContext, id: Option<&str>, _params: ClinicParams) -> Result<Value> {
        let id = id.filter(|s| !s.trim().is_empty());
        let (Some(id), Some(clinic)) = (id, ctx.clinic_id()) else {
            return Err(BiyoError::bad_request("Missing id or clinicId").into_anyhow());
        };

        self.repo
            .delete_where(|r| str_of(r, "id") == Some(id) && str_of(r, "clinicId") == Some(clinic))
            .await
            .map_err(store_error)?;
        Ok(json!({ "success": true }))
    }
}

pub fn ensure_id(obj: &mut Map<String, Value>, prefix: &str) -> String {
    match obj.get("id").and_then(Value::as_str).filter(|s| !s.is_empty()) {
        Some(id) => id.to_string(),
        None => {
            let id = new_id(prefix);
            obj.insert("id".to_string(), Value::String(id.clone()));
            id
        }
    }
}

/// Fill a missing or blank `clinicId` from the tenant.
pub fn stamp_clinic(obj: &mut Map<String, Value>, ctx: &TenantContext) {
    let missing = obj
        .get("clinicId")
        .map_or(true, |v| v.is_null() || v.as_str().is_some_and(str::is_empty));
    if let (true, Some(clinic)) = (missing, ctx.clinic_id()) {
        obj.insert("clinicId".to_string(), Value::String(clinic.to_string()));
    }
}

/// Implements `BiyoService` for a struct with an `adapter: TableAdapter`
/// field by delegating every method to it.
#[macro_export]
macro_rules! table_service {
    ($ty:ty) => {
        #[async_trait::async_trait]
        impl biyo_core::BiyoService<serde_json::Value, $crate::services::ClinicParams> for $ty {
            fn capabilities(&self) -> biyo_core::ServiceCapabilities {
                self.adapter.capabilities.clone()
            }

            async fn find(
                &self,
                ctx: &biyo_core::TenantContext,
                params: $crate::services::ClinicParams,
            ) -> anyhow::Result<Vec<serde_json::Value>> {
                self.adapter._find(ctx, params).await
            }

            async fn get(
                &self,
                ctx: &biyo_core::TenantContext,
                id: &str,
                params: $crate::services::ClinicParams,
            ) -> anyhow::Result<serde_json::Value> {
                self.adapter._get(ctx, id, params).await
            }

            async fn create(
                &self,
                ctx: &biyo_core::TenantContext,
                data: serde_json::Value,
                params: $crate::services::ClinicParams,
            ) -> anyhow::Result<serde_json::Value> {
                self.adapter._create(ctx, data, params).await
            }

            async fn remove(
                &self,
                ctx: &biyo_core::TenantContext,
                id: Option<&str>,
                params: $crate::services::ClinicParams,
            ) -> anyhow::Result<serde_json::Value> {
                self.adapter._remove(ctx, id, params).await
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use biyo_store::{KvTableStore, MemoryKv, Table};

    use super::*;

    fn adapter(table: Table, filters: &'static [&'static str]) -> TableAdapter {
        let store = Arc::new(KvTableStore::new(MemoryKv::new()));
        TableAdapter {
            repo: Repository::new(store, table),
            id_prefix: "visit",
            not_found_prefix: "Visit not found",
            filters,
            clinic_scoped: true,
            capabilities: ServiceCapabilities::standard_crud(),
        }
    }

    #[tokio::test]
    async fn create_assigns_id_and_clinic() {
        let a = adapter(Table::Visits, &[]);
        let out = a
            ._create(&TenantContext::new("c1"), json!({ "cost": 10 }), ClinicParams::default())
            .await
            .unwrap();

        assert!(str_of(&out, "id").unwrap().starts_with("visit_"));
        assert_eq!(out["clinicId"], "c1");

        let kept = a
            ._create(
                &TenantContext::new("c1"),
                json!({ "id": "v1", "clinicId": "c2" }),
                ClinicParams::default(),
            )
            .await
            .unwrap();
        assert_eq!(kept["clinicId"], "c2");
        assert!(a._create(&TenantContext::unscoped(), json!([1]), ClinicParams::default()).await.is_err());
    }

    #[tokio::test]
    async fn find_filters_by_tenant_and_query() {
        let a = adapter(Table::Visits, &["patientId", "status"]);
        for (id, clinic, patient) in [("v1", "c1", "p1"), ("v2", "c1", "p2"), ("v3", "c2", "p1")] {
            a._create(
                &TenantContext::unscoped(),
                json!({ "id": id, "clinicId": clinic, "patientId": patient }),
                ClinicParams::default(),
            )
            .await
            .unwrap();
        }

        let all = a._find(&TenantContext::unscoped(), ClinicParams::default()).await.unwrap();
        assert_eq!(all.len(), 3);

        let c1 = a._find(&TenantContext::new("c1"), ClinicParams::default()).await.unwrap();
        assert_eq!(c1.len(), 2);

        let params = ClinicParams::internal([("patientId", "p1"), ("status", "")]);
        let c1_p1 = a._find(&TenantContext::new("c1"), params).await.unwrap();
        assert_eq!(c1_p1.len(), 1);
        assert_eq!(c1_p1[0]["id"], "v1");

        let err = a._get(&TenantContext::new("c2"), "v1", ClinicParams::default()).await.unwrap_err();
        assert_eq!(BiyoError::find_in(&err).map(|e| e.code()), Some(404));
    }

    #[tokio::test]
    async fn remove_needs_both_keys_and_only_hits_the_pair() {
        let a = adapter(Table::Visits, &[]);
        for clinic in ["c1", "c2"] {
            a._create(
                &TenantContext::unscoped(),
                json!({ "id": "v1", "clinicId": clinic }),
                ClinicParams::default(),
            )
            .await
            .unwrap();
        }
        // same id in two clinics: the second upsert replaced the first
        assert_eq!(a._find(&TenantContext::unscoped(), ClinicParams::default()).await.unwrap().len(), 1);

        let err = a._remove(&TenantContext::unscoped(), Some("v1"), ClinicParams::default()).await.unwrap_err();
        assert_eq!(BiyoError::find_in(&err).map(|e| e.message.clone()), Some("Missing id or clinicId".into()));

        let out = a._remove(&TenantContext::new("c1"), Some("v1"), ClinicParams::default()).await.unwrap();
        assert_eq!(out, json!({ "success": true }));
        assert_eq!(a._find(&TenantContext::unscoped(), ClinicParams::default()).await.unwrap().len(), 1);

        a._remove(&TenantContext::new("c2"), Some("v1"), ClinicParams::default()).await.unwrap();
        assert!(a._find(&TenantContext::unscoped(), ClinicParams::default()).await.unwrap().is_empty());
    }
}
