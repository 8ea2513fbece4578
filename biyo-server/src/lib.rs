//! biyo-server: the clinic backend's HTTP API.
//!
//! Every table is a service under `/api/…` (see [`services`]); payments,
//! analytics and the CSV export sit next to them.

mod app;
pub mod config;
pub mod exports;
pub mod hooks;
pub mod services;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::{OriginalUri, Query};
use axum::http::HeaderMap;
use axum::Json;
use biyo_axum::AxumApp;
use biyo_model::ids::now_iso;
use biyo_store::TableStore;
use serde_json::{json, Value};

pub use config::{ServerConfig, StoreConfig};
pub use services::ClinicParams;

async fn health() -> Json<Value> {
    Json(json!({ "ok": true, "timestamp": now_iso() }))
}

/// Build the app on the store named by `config`.
pub fn build(config: ServerConfig) -> Result<AxumApp<Value, ClinicParams>> {
    let store = config.open_store();
    build_with_store(config, store)
}

pub fn build_with_store(
    config: ServerConfig,
    store: Arc<dyn TableStore>,
) -> Result<AxumApp<Value, ClinicParams>> {
    let ax = app::clinic_app(&config)?;
    let svcs = services::configure(ax.app.as_ref(), store)?;

    let export_app = Arc::clone(&ax.app);
    let export = move |headers: HeaderMap,
                       Query(query): Query<HashMap<String, String>>,
                       OriginalUri(uri): OriginalUri| {
        let app = Arc::clone(&export_app);
        async move { exports::export_patients(app, headers, query, uri).await }
    };

    let ax = ax
        .use_service("/api/patients", svcs.patients)
        .use_service("/api/doctors", svcs.doctors)
        .use_service("/api/services", svcs.services)
        .use_service("/api/visits", svcs.visits)
        .use_service("/api/clinics", svcs.clinics)
        .use_service("/api/users", svcs.users)
        .use_service("/api/files", svcs.files)
        .use_service("/api/payments", svcs.payments)
        .use_service("/api/analytics", svcs.analytics)
        .use_get("/api/exports/patients", export)
        .service("/health", health)
        .service("/api/health", health)
        .with_http_layers(config.body_limit);

    Ok(ax)
}
