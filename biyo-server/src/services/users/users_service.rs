use biyo_store::{Repository, Table, TableStore};
use std::sync::Arc;

use crate::services::adapters::TableAdapter;

use super::users_shared;

pub struct UsersService {
    pub adapter: TableAdapter,
}

impl UsersService {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self {
            adapter: TableAdapter {
                repo: Repository::new(store, Table::Users),
                id_prefix: "user",
                not_found_prefix: "User not found",
                filters: &["email"],
                clinic_scoped: true,
                capabilities: users_shared::capabilities(),
            },
        }
    }
}

crate::table_service!(UsersService);
