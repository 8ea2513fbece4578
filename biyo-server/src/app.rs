use anyhow::Result;
use biyo_axum::{axum, AxumApp};
use biyo_core::{load_env_config, BiyoApp};
use serde_json::Value;
use tracing::debug;

use crate::config::ServerConfig;
use crate::services::ClinicParams;

pub fn clinic_app(config: &ServerConfig) -> Result<AxumApp<Value, ClinicParams>> {
    let biyo_app: BiyoApp<Value, ClinicParams> = BiyoApp::new();
    config.apply(&biyo_app);

    // BIYO__TENANT__ENFORCE=true and friends land on top of the typed config.
    let overrides = load_env_config(&biyo_app, "BIYO");
    debug!(overrides, "env config loaded");

    crate::hooks::global_hooks(&biyo_app);
    Ok(axum(biyo_app))
}
