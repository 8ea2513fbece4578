use biyo_store::{Repository, Table, TableStore};
use std::sync::Arc;

use crate::services::adapters::TableAdapter;

use super::patients_shared;

pub struct PatientsService {
    pub adapter: TableAdapter,
}

impl PatientsService {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self {
            adapter: TableAdapter {
                repo: Repository::new(store, Table::Patients),
                id_prefix: "patient",
                not_found_prefix: "Patient not found",
                filters: &[],
                clinic_scoped: true,
                capabilities: patients_shared::crud_capabilities(),
            },
        }
    }
}

crate::table_service!(PatientsService);
