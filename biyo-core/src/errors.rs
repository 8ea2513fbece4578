//! # Errors
//!
//! Structured errors that travel inside `anyhow::Error` through the hook
//! pipeline and come out the other side with a status code, a Feathers-style
//! `name` / `className`, and optional `data` / `errors` payloads.
//!
//! With feature `serde`, `to_json()` renders the client payload. The payload
//! always carries an `error` field with the message, which is what clinic
//! front-ends read.

use std::fmt;

use anyhow::Error as AnyError;

pub type BiyoResult<T> = std::result::Result<T, AnyError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,
    NotAuthenticated,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    Timeout,
    Conflict,
    Unprocessable,
    GeneralError,
    BadGateway,
    Unavailable,
}

impl ErrorKind {
    fn meta(&self) -> (u16, &'static str, &'static str) {
        match self {
            ErrorKind::BadRequest => (400, "BadRequest", "bad-request"),
            ErrorKind::NotAuthenticated => (401, "NotAuthenticated", "not-authenticated"),
            ErrorKind::Forbidden => (403, "Forbidden", "forbidden"),
            ErrorKind::NotFound => (404, "NotFound", "not-found"),
            ErrorKind::MethodNotAllowed => (405, "MethodNotAllowed", "method-not-allowed"),
            ErrorKind::Timeout => (408, "Timeout", "timeout"),
            ErrorKind::Conflict => (409, "Conflict", "conflict"),
            ErrorKind::Unprocessable => (422, "Unprocessable", "unprocessable"),
            ErrorKind::GeneralError => (500, "GeneralError", "general-error"),
            ErrorKind::BadGateway => (502, "BadGateway", "bad-gateway"),
            ErrorKind::Unavailable => (503, "Unavailable", "unavailable"),
        }
    }

    pub fn status_code(&self) -> u16 {
        self.meta().0
    }

    pub fn name(&self) -> &'static str {
        self.meta().1
    }

    pub fn class_name(&self) -> &'static str {
        self.meta().2
    }
}

#[cfg(feature = "serde")]
pub type ErrorValue = serde_json::Value;

#[cfg(not(feature = "serde"))]
pub type ErrorValue = std::sync::Arc<dyn std::any::Any + Send + Sync>;

#[derive(Debug)]
pub struct BiyoError {
    pub kind: ErrorKind,
    pub message: String,
    pub data: Option<ErrorValue>,
    pub errors: Option<ErrorValue>,
    pub source: Option<AnyError>,
}

impl BiyoError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            data: None,
            errors: None,
            source: None,
        }
    }

    pub fn with_data(mut self, data: ErrorValue) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_errors(mut self, errors: ErrorValue) -> Self {
        self.errors = Some(errors);
        self
    }

    pub fn with_source(mut self, source: AnyError) -> Self {
        self.source = Some(source);
        self
    }

    pub fn code(&self) -> u16 {
        self.kind.status_code()
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn class_name(&self) -> &'static str {
        self.kind.class_name()
    }

    pub fn into_anyhow(self) -> AnyError {
        AnyError::new(self)
    }

    /// Find a `BiyoError` anywhere in an error's context chain.
    pub fn find_in(err: &AnyError) -> Option<&BiyoError> {
        err.chain().find_map(|e| e.downcast_ref::<BiyoError>())
    }

    /// Keep a `BiyoError` as is; wrap anything else as a `GeneralError`
    /// carrying the original message.
    pub fn normalize(err: AnyError) -> BiyoError {
        match err.downcast::<BiyoError>() {
            Ok(e) => e,
            Err(other) => {
                BiyoError::new(ErrorKind::GeneralError, other.to_string()).with_source(other)
            }
        }
    }

    /// Copy without the inner `source`, safe to hand to clients.
    pub fn sanitize_for_client(&self) -> BiyoError {
        BiyoError {
            kind: self.kind,
            message: self.message.clone(),
            data: self.data.clone(),
            errors: self.errors.clone(),
            source: None,
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, msg)
    }
    pub fn not_authenticated(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotAuthenticated, msg)
    }
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, msg)
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, msg)
    }
    pub fn method_not_allowed(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::MethodNotAllowed, msg)
    }
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, msg)
    }
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, msg)
    }
    pub fn unprocessable(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unprocessable, msg)
    }
    pub fn general_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::GeneralError, msg)
    }
    pub fn bad_gateway(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadGateway, msg)
    }
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unavailable, msg)
    }
}

impl fmt::Display for BiyoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name(), self.code(), self.message)
    }
}

impl std::error::Error for BiyoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

#[cfg(feature = "serde")]
impl BiyoError {
    pub fn to_json(&self) -> serde_json::Value {
        let mut body = serde_json::json!({
            "error": self.message,
            "name": self.name(),
            "message": self.message,
            "code": self.code(),
            "className": self.class_name(),
        });

        if let Some(d) = &self.data {
            body["data"] = d.clone();
        }
        if let Some(e) = &self.errors {
            body["errors"] = e.clone();
        }
        body
    }
}

/// Return early with a `BiyoError` built by one of its constructors.
///
/// ```ignore
/// bail_biyo!(bad_request, "Missing id or clinicId");
/// bail_biyo!(not_found, "Visit not found: {}", visit_id);
/// ```
#[macro_export]
macro_rules! bail_biyo {
    ($ctor:ident, $msg:expr) => {
        return Err($crate::errors::BiyoError::$ctor($msg).into_anyhow())
    };
    ($ctor:ident, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::errors::BiyoError::$ctor(format!($fmt, $($arg)*)).into_anyhow())
    };
}
