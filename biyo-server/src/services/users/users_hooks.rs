use anyhow::Result;
use async_trait::async_trait;
use biyo_core::errors::BiyoError;
use biyo_core::{BeforeHook, HookContext, TenantContext};
use serde_json::Value;

use crate::services::adapters::table_adapter::str_of;
use crate::services::ClinicParams;

/// One account per email address. Saving the same user again is fine.
pub struct UniqueEmail;

#[async_trait]
impl BeforeHook<Value, ClinicParams> for UniqueEmail {
    async fn run(&self, ctx: &mut HookContext<Value, ClinicParams>) -> Result<()> {
        let Some(data) = ctx.data.as_ref() else {
            return Ok(());
        };
        let Some(email) = str_of(data, "email").map(str::trim).filter(|e| !e.is_empty()) else {
            return Ok(());
        };
        let id = str_of(data, "id");

        let users = ctx.services.service("users")?;
        let same_email = users
            .find(TenantContext::unscoped(), ClinicParams::internal([("email", email)]))
            .await?;

        if same_email.iter().any(|u| str_of(u, "id") != id) {
            return Err(BiyoError::conflict("User with this email already exists")
                .with_data(serde_json::json!({ "email": email }))
                .into_anyhow());
        }
        Ok(())
    }
}
