//! Payments live inside their visit's `payments` array; there is no
//! payments table.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use biyo_core::errors::BiyoError;
use biyo_core::tenant::TenantContext;
use biyo_core::{BiyoService, ServiceCapabilities};
use biyo_model::ids::now_iso;
use biyo_model::{new_id, Payment, PaymentMethod, Visit};
use biyo_store::{Repository, StoreError, StoreResult, Table, TableStore};
use serde_json::{json, Value};
use tracing::info;

use crate::services::adapters::table_adapter::{store_error, str_of};
use crate::services::ClinicParams;

use super::payments_shared;

pub struct PaymentsService {
    visits: Repository,
}

fn bad_request(msg: impl Into<String>) -> anyhow::Error {
    BiyoError::bad_request(msg).into_anyhow()
}

/// Validate a payment body. `visitId` and a positive `amount` are
/// required; `method`, when given, must be `cash` or `ewallet`.
pub fn parse_payment(data: &Value) -> Result<Payment> {
    let visit_id = str_of(data, "visitId").map(str::trim).unwrap_or_default();
    let amount = data.get("amount").and_then(Value::as_f64);
    let (false, Some(amount)) = (visit_id.is_empty(), amount) else {
        return Err(bad_request("visitId and amount are required"));
    };
    if !amount.is_finite() || amount <= 0.0 {
        return Err(bad_request("amount must be a positive number"));
    }

    let method = match data.get("method") {
        None | Some(Value::Null) => None,
        Some(Value::String(m)) if m.is_empty() => None,
        Some(Value::String(m)) => Some(
            PaymentMethod::parse(m).ok_or_else(|| bad_request(format!("Unknown payment method: {m}")))?,
        ),
        Some(_) => return Err(bad_request("method must be a string")),
    };

    let non_empty = |key: &str| str_of(data, key).filter(|s| !s.is_empty()).map(str::to_string);
    Ok(Payment {
        id: non_empty("id").unwrap_or_else(|| new_id("payment")),
        visit_id: visit_id.to_string(),
        amount,
        date: non_empty("date").unwrap_or_else(now_iso),
        method,
    })
}

/// Write the payment list and totals of `visit` back onto the stored
/// record, leaving every other field as stored.
fn write_back(mut stored: Value, visit: &Visit) -> StoreResult<Value> {
    let Some(obj) = stored.as_object_mut() else {
        return Err(StoreError::invalid("Stored visit is not an object"));
    };
    obj.insert("payments".to_string(), serde_json::to_value(&visit.payments)?);
    obj.insert("cashAmount".to_string(), json!(visit.cash_amount));
    obj.insert("ewalletAmount".to_string(), json!(visit.ewallet_amount));
    Ok(stored)
}

fn as_visit(stored: &Value) -> StoreResult<Visit> {
    Ok(serde_json::from_value(stored.clone())?)
}

impl PaymentsService {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self {
            visits: Repository::new(store, Table::Visits),
        }
    }
}

#[async_trait]
impl BiyoService<Value, ClinicParams> for PaymentsService {
    fn capabilities(&self) -> ServiceCapabilities {
        payments_shared::capabilities()
    }

    async fn create(&self, ctx: &TenantContext, data: Value, _params: ClinicParams) -> Result<Value> {
        let payment = parse_payment(&data)?;
        let visit_id = payment.visit_id.clone();
        let incoming = payment.clone();

        let updated = self
            .visits
            .update(
                |v| str_of(v, "id") == Some(visit_id.as_str()) && ctx.admits(str_of(v, "clinicId")),
                move |stored| {
                    let mut visit = as_visit(&stored)?;
                    visit.add_payment(incoming);
                    write_back(stored, &visit)
                },
            )
            .await
            .map_err(store_error)?
            .ok_or_else(|| BiyoError::not_found("Visit not found").into_anyhow())?;

        let visit = as_visit(&updated).map_err(store_error)?;
        info!(
            visit = %visit.id,
            payment = %payment.id,
            amount = payment.amount,
            "payment recorded"
        );
        let recorded = visit
            .payments
            .iter()
            .find(|p| p.id == payment.id)
            .cloned()
            .unwrap_or(payment);
        Ok(serde_json::to_value(recorded)?)
    }

    async fn remove(&self, ctx: &TenantContext, id: Option<&str>, _params: ClinicParams) -> Result<Value> {
        let Some(payment_id) = id.filter(|s| !s.trim().is_empty()) else {
            return Err(bad_request("Missing payment id"));
        };

        let holds_payment = |v: &Value| {
            ctx.admits(str_of(v, "clinicId"))
                && v.get("payments")
                    .and_then(Value::as_array)
                    .is_some_and(|ps| ps.iter().any(|p| str_of(p, "id") == Some(payment_id)))
        };
        let updated = self
            .visits
            .update(holds_payment, |stored| {
                let mut visit = as_visit(&stored)?;
                visit.remove_payment(payment_id);
                write_back(stored, &visit)
            })
            .await
            .map_err(store_error)?
            .ok_or_else(|| BiyoError::not_found("Payment not found").into_anyhow())?;

        let visit_id = str_of(&updated, "id").unwrap_or_default();
        info!(visit = visit_id, payment = payment_id, "payment removed");
        Ok(json!({ "success": true }))
    }
}
