pub mod table_adapter;

pub use table_adapter::{store_error, TableAdapter};
