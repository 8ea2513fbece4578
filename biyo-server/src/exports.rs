use std::collections::HashMap;
use std::sync::Arc;

use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderMap, Uri};
use axum::response::{IntoResponse, Response};
use biyo_axum::rest::tenant_from_request;
use biyo_axum::BiyoAxumError;
use biyo_core::errors::BiyoError;
use biyo_core::BiyoApp;
use biyo_model::{patients_csv, Patient, PatientQuery};
use serde_json::Value;
use tracing::{info, warn};

use crate::services::ClinicParams;

/// `GET /api/exports/patients?clinicId=…[&q=…]` as a CSV attachment.
pub async fn export_patients(
    app: Arc<BiyoApp<Value, ClinicParams>>,
    headers: HeaderMap,
    query: HashMap<String, String>,
    uri: Uri,
) -> Result<Response, BiyoAxumError> {
    let tenant = tenant_from_request(&query, &headers);
    let Some(clinic) = tenant.clinic_id().map(str::to_string) else {
        return Err(BiyoError::bad_request("clinicId is required").into());
    };
    let filter = PatientQuery {
        text: query.get("q").cloned(),
    };

    let params = ClinicParams::from_parts("rest", &headers, query, "GET", &uri);
    let rows = app.service("patients")?.find(tenant, params).await?;

    let patients: Vec<Patient> = rows
        .into_iter()
        .filter_map(|row| match serde_json::from_value(row) {
            Ok(p) => Some(p),
            Err(e) => {
                warn!(error = %e, "skipping unreadable patient in export");
                None
            }
        })
        .collect();

    let selected = filter.apply(&patients);
    info!(clinic = %clinic, rows = selected.len(), "patients exported");

    Ok((
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8"),
            (CONTENT_DISPOSITION, "attachment; filename=\"patients.csv\""),
        ],
        patients_csv(selected),
    )
        .into_response())
}
