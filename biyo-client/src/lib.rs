//! biyo-client: what the clinic front end needs from the API.
//!
//! [`ClinicStore`] serves reads from a local cache, writes through to the
//! server and merges fresh server snapshots on a timer ([`SyncWorker`]).
//! A [`CircuitBreaker`] pauses syncing while the server is unreachable.

pub mod api;
pub mod breaker;
pub mod cache;
pub mod config;
pub mod error;
pub mod store;
pub mod sync;

pub use api::ApiClient;
pub use breaker::{BreakerState, CircuitBreaker};
pub use cache::{Collection, LocalCache};
pub use config::ClientConfig;
pub use error::{ApiError, ClientError, ClientResult};
pub use store::{ClinicStore, DataChange};
pub use sync::{SyncHandle, SyncWorker};
