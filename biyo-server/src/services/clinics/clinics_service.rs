use biyo_store::{Repository, Table, TableStore};
use std::sync::Arc;

use crate::services::adapters::TableAdapter;

use super::clinics_shared;

pub struct ClinicsService {
    pub adapter: TableAdapter,
}

impl ClinicsService {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self {
            adapter: TableAdapter {
                repo: Repository::new(store, Table::Clinics),
                id_prefix: "clinic",
                not_found_prefix: "Clinic not found",
                filters: &["id"],
                clinic_scoped: false,
                capabilities: clinics_shared::capabilities(),
            },
        }
    }
}

crate::table_service!(ClinicsService);
