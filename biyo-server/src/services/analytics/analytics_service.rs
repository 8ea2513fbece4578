use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use biyo_core::errors::BiyoError;
use biyo_core::tenant::TenantContext;
use biyo_core::{BiyoService, ServiceCapabilities, ServiceMethodKind};
use biyo_model::time::parse_date;
use biyo_model::{summarize, AnalyticsQuery, Doctor, Patient, Service, Visit};
use biyo_store::{Repository, Table, TableStore};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::services::adapters::table_adapter::{store_error, str_of};
use crate::services::ClinicParams;

/// Read-only dashboard figures at `GET /api/analytics/summary`.
pub struct AnalyticsService {
    patients: Repository,
    visits: Repository,
    doctors: Repository,
    services: Repository,
}

impl AnalyticsService {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self {
            patients: Repository::new(Arc::clone(&store), Table::Patients),
            visits: Repository::new(Arc::clone(&store), Table::Visits),
            doctors: Repository::new(Arc::clone(&store), Table::Doctors),
            services: Repository::new(store, Table::Services),
        }
    }

    /// One clinic's rows as typed records. Rows that do not fit the
    /// record shape are skipped.
    async fn load<T: DeserializeOwned>(&self, repo: &Repository, clinic: &str) -> Result<Vec<T>> {
        let rows = repo
            .try_list(|r| str_of(r, "clinicId") == Some(clinic))
            .await
            .map_err(store_error)?;

        Ok(rows
            .into_iter()
            .filter_map(|row| match serde_json::from_value(row) {
                Ok(v) => Some(v),
                Err(e) => {
                    warn!(table = %repo.table(), error = %e, "skipping unreadable row");
                    None
                }
            })
            .collect())
    }
}

pub fn parse_query(params: &ClinicParams) -> Result<AnalyticsQuery> {
    let date = |key: &str| -> Result<_> {
        match params.query_value(key) {
            None => Ok(None),
            Some(raw) => parse_date(raw)
                .map(Some)
                .ok_or_else(|| BiyoError::bad_request(format!("Invalid {key} date: {raw}")).into_anyhow()),
        }
    };
    Ok(AnalyticsQuery {
        from: date("from")?,
        to: date("to")?,
        doctor_id: params.query_value("doctorId").map(str::to_string),
    })
}

#[async_trait]
impl BiyoService<Value, ClinicParams> for AnalyticsService {
    fn capabilities(&self) -> ServiceCapabilities {
        ServiceCapabilities::from_methods(vec![ServiceMethodKind::Get])
    }

    async fn get(&self, ctx: &TenantContext, id: &str, params: ClinicParams) -> Result<Value> {
        if id != "summary" {
            return Err(BiyoError::not_found(format!("Unknown report: {id}")).into_anyhow());
        }
        let Some(clinic) = ctx.clinic_id() else {
            return Err(BiyoError::bad_request("clinicId is required").into_anyhow());
        };
        let query = parse_query(&params)?;

        let patients: Vec<Patient> = self.load(&self.patients, clinic).await?;
        let visits: Vec<Visit> = self.load(&self.visits, clinic).await?;
        let doctors: Vec<Doctor> = self.load(&self.doctors, clinic).await?;
        let services: Vec<Service> = self.load(&self.services, clinic).await?;

        let summary = summarize(&patients, &visits, &doctors, &services, &query);
        Ok(serde_json::to_value(summary)?)
    }
}
