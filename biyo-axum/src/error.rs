use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use biyo_core::errors::BiyoError;
use tracing::error;

#[derive(Debug)]
pub struct BiyoAxumError(pub anyhow::Error);

impl From<anyhow::Error> for BiyoAxumError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

impl From<BiyoError> for BiyoAxumError {
    fn from(e: BiyoError) -> Self {
        Self(e.into_anyhow())
    }
}

impl IntoResponse for BiyoAxumError {
    fn into_response(self) -> Response {
        // Anything that is not a BiyoError somewhere in the chain is a 500
        // carrying the top-level message.
        let safe = match BiyoError::find_in(&self.0) {
            Some(e) => e.sanitize_for_client(),
            None => BiyoError::general_error(self.0.to_string()),
        };

        let status =
            StatusCode::from_u16(safe.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(code = safe.code(), error = format!("{:#}", self.0), "request failed");
        }
        (status, Json(safe.to_json())).into_response()
    }
}
