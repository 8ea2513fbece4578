use biyo_store::{Repository, Table, TableStore};
use std::sync::Arc;

use crate::services::adapters::TableAdapter;

use super::doctors_shared;

pub struct DoctorsService {
    pub adapter: TableAdapter,
}

impl DoctorsService {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self {
            adapter: TableAdapter {
                repo: Repository::new(store, Table::Doctors),
                id_prefix: "doctor",
                not_found_prefix: "Doctor not found",
                filters: &[],
                clinic_scoped: true,
                capabilities: doctors_shared::crud_capabilities(),
            },
        }
    }
}

crate::table_service!(DoctorsService);
