use biyo_store::{Repository, Table, TableStore};
use std::sync::Arc;

use crate::services::adapters::TableAdapter;

use super::visits_shared;

pub struct VisitsService {
    pub adapter: TableAdapter,
}

impl VisitsService {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self {
            adapter: TableAdapter {
                repo: Repository::new(store, Table::Visits),
                id_prefix: "visit",
                not_found_prefix: "Visit not found",
                filters: &["patientId", "doctorId", "status"],
                clinic_scoped: true,
                capabilities: visits_shared::crud_capabilities(),
            },
        }
    }
}

crate::table_service!(VisitsService);
