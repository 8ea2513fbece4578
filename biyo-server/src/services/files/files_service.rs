use biyo_store::{Repository, Table, TableStore};
use std::sync::Arc;

use crate::services::adapters::TableAdapter;

use super::files_shared;

pub struct FilesService {
    pub adapter: TableAdapter,
}

impl FilesService {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self {
            adapter: TableAdapter {
                repo: Repository::new(store, Table::Files),
                id_prefix: "file",
                not_found_prefix: "File not found",
                filters: &["patientId"],
                clinic_scoped: true,
                capabilities: files_shared::crud_capabilities(),
            },
        }
    }
}

crate::table_service!(FilesService);
