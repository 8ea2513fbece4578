//! biyo-axum: serves `biyo-core` services over HTTP with Axum.
//!
//! Every registered service gets the same REST surface; see [`rest`].

pub mod app;
pub mod params;
pub mod rest;
pub mod state;
mod error;
pub use error::BiyoAxumError;
pub use state::BiyoAxumState;

pub use app::{axum, AxumApp, DEFAULT_BODY_LIMIT};
pub use params::{FromRestParams, RestParams};
