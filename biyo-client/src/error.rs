use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// The server answered with a non-success status.
    #[error("{message} (status {status})")]
    Status {
        status: u16,
        message: String,
        body: Value,
    },

    #[error("Request timed out: {url}")]
    Timeout { url: String },

    #[error("Cannot reach the server at {url}: {message}")]
    Unreachable { url: String, message: String },

    #[error("Unexpected response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// No answer at all, as opposed to an answer we did not like.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, ApiError::Timeout { .. } | ApiError::Unreachable { .. })
    }

    pub(crate) fn from_reqwest(url: &str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout { url: url.to_string() }
        } else if e.is_decode() {
            ApiError::Decode {
                url: url.to_string(),
                message: e.to_string(),
            }
        } else {
            ApiError::Unreachable {
                url: url.to_string(),
                message: e.to_string(),
            }
        }
    }
}

/// The text to show for an error body: `detail`, then `error`, then
/// `message`, then the body itself when it is plain text.
pub fn error_message(body: &Value, fallback: &str) -> String {
    fn pick(v: Option<&Value>) -> Option<&str> {
        v.and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty())
    }

    let found = match body {
        Value::String(_) => pick(Some(body)),
        Value::Object(obj) => pick(obj.get("detail"))
            .or_else(|| pick(obj.get("error")))
            .or_else(|| pick(obj.get("message"))),
        _ => None,
    };
    found.map(str::to_string).unwrap_or_else(|| fallback.to_string())
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("No clinic ID available. Please log in.")]
    NoClinic,

    #[error("Payment amount must be greater than zero")]
    InvalidAmount,

    #[error("Cache snapshot error: {source}")]
    Snapshot {
        #[from]
        source: std::io::Error,
    },

    #[error("Cache snapshot is not valid JSON: {source}")]
    SnapshotFormat {
        #[from]
        source: serde_json::Error,
    },
}

pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_text_prefers_detail_then_error_then_message() {
        let body = json!({ "detail": "d", "error": "e", "message": "m" });
        assert_eq!(error_message(&body, "x"), "d");
        assert_eq!(error_message(&json!({ "error": "e", "message": "m" }), "x"), "e");
        assert_eq!(error_message(&json!({ "error": " ", "message": "m" }), "x"), "m");
        assert_eq!(error_message(&json!("plain text"), "x"), "plain text");
        assert_eq!(error_message(&json!({ "code": 500 }), "fallback"), "fallback");
        assert_eq!(error_message(&Value::Null, "fallback"), "fallback");
    }
}
