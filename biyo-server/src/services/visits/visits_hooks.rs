use anyhow::Result;
use async_trait::async_trait;
use biyo_core::errors::BiyoError;
use biyo_core::{BeforeHook, HookContext};
use biyo_model::{Payment, PaymentTotals, VisitService};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};

use crate::services::ClinicParams;

fn read_list<T: DeserializeOwned>(obj: &Map<String, Value>, key: &str) -> Result<Vec<T>> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(v) => serde_json::from_value(v.clone()).map_err(|e| {
            BiyoError::bad_request(format!("Invalid {key}"))
                .with_errors(json!({ key: [e.to_string()] }))
                .into_anyhow()
        }),
    }
}

/// Brings a visit body into its stored shape: services as
/// `{serviceId, quantity, teeth}` objects, `payments` present, and the
/// per-method totals matching the payments.
pub struct NormalizeVisit;

#[async_trait]
impl BeforeHook<Value, ClinicParams> for NormalizeVisit {
    async fn run(&self, ctx: &mut HookContext<Value, ClinicParams>) -> Result<()> {
        let Some(Value::Object(obj)) = ctx.data.as_mut() else {
            return Ok(());
        };

        let services: Vec<VisitService> = read_list(obj, "services")?;
        obj.insert("services".to_string(), serde_json::to_value(services)?);

        let payments: Vec<Payment> = read_list(obj, "payments")?;
        if obj.get("payments").map_or(true, Value::is_null) {
            obj.insert("payments".to_string(), json!([]));
        }

        let totals = PaymentTotals::of(&payments);
        obj.insert("cashAmount".to_string(), json!(totals.cash));
        obj.insert("ewalletAmount".to_string(), json!(totals.ewallet));
        Ok(())
    }
}
