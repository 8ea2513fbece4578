use biyo_store::{Repository, Table, TableStore};
use std::sync::Arc;

use crate::services::adapters::TableAdapter;

use super::catalog_shared;

pub struct CatalogService {
    pub adapter: TableAdapter,
}

impl CatalogService {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self {
            adapter: TableAdapter {
                repo: Repository::new(store, Table::Services),
                id_prefix: "service",
                not_found_prefix: "Service not found",
                filters: &[],
                clinic_scoped: true,
                capabilities: catalog_shared::crud_capabilities(),
            },
        }
    }
}

crate::table_service!(CatalogService);
