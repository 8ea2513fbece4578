//! biyo-store: JSON record tables for the Biyo clinic backend.
//!
//! Every logical table (patients, visits, ...) is a flat list of JSON
//! objects keyed by their `id`. Backends only need to load a whole table,
//! replace-or-append one record, and drop the records matching a predicate:
//!
//! - [`KvTableStore`]: one JSON array per table under `"{prefix}:{table}"`,
//!   over memory, a directory of files, or an Upstash-compatible REST KV.
//! - [`SheetsTableStore`]: one spreadsheet tab per table, rows
//!   `[id, clinicId, data]` under a header row.
//!
//! [`Repository`] binds a store to one table and adds filtering.

pub mod error;
pub mod kv;
pub mod sheets;
pub mod store;
pub mod table;

pub use error::{StoreError, StoreResult};
pub use kv::{FileKv, KvBackend, KvTableStore, MemoryKv, RestKv};
pub use sheets::{ServiceAccount, SheetsClient, SheetsTableStore};
pub use store::{Repository, RowPredicate, RowUpdate, TableStore, UpsertOutcome};
pub use table::Table;
