use serde::{Deserialize, Serialize};

use crate::money::{round2, sum2};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisitStatus {
    #[default]
    Scheduled,
    Completed,
    Cancelled,
}

impl VisitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisitStatus::Scheduled => "scheduled",
            VisitStatus::Completed => "completed",
            VisitStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Ewallet,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Ewallet => "ewallet",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "cash" => Some(PaymentMethod::Cash),
            "ewallet" => Some(PaymentMethod::Ewallet),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Payment {
    pub id: String,
    pub visit_id: String,
    pub amount: f64,
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<PaymentMethod>,
}

/// A service performed during a visit.
///
/// Older records list bare service ids; those read as quantity 1 with no
/// teeth. Writing always produces the object form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "VisitServiceWire")]
pub struct VisitService {
    pub service_id: String,
    pub quantity: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub teeth: Vec<u32>,
}

impl VisitService {
    pub fn new(service_id: impl Into<String>) -> Self {
        Self {
            service_id: service_id.into(),
            quantity: 1,
            teeth: Vec::new(),
        }
    }
}

fn one() -> u32 {
    1
}

#[derive(Deserialize)]
#[serde(untagged)]
enum VisitServiceWire {
    Id(String),
    Rich {
        #[serde(rename = "serviceId")]
        service_id: String,
        #[serde(default = "one")]
        quantity: u32,
        #[serde(default)]
        teeth: Option<Vec<u32>>,
    },
}

impl From<VisitServiceWire> for VisitService {
    fn from(wire: VisitServiceWire) -> Self {
        match wire {
            VisitServiceWire::Id(id) => VisitService::new(id),
            VisitServiceWire::Rich {
                service_id,
                quantity,
                teeth,
            } => VisitService {
                service_id,
                quantity,
                teeth: teeth.unwrap_or_default(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PaymentTotals {
    pub cash: f64,
    pub ewallet: f64,
    /// Every payment, including ones with no method recorded.
    pub total: f64,
}

impl PaymentTotals {
    pub fn of(payments: &[Payment]) -> Self {
        let by = |m: PaymentMethod| {
            sum2(
                payments
                    .iter()
                    .filter(|p| p.method == Some(m))
                    .map(|p| p.amount),
            )
        };
        Self {
            cash: by(PaymentMethod::Cash),
            ewallet: by(PaymentMethod::Ewallet),
            total: sum2(payments.iter().map(|p| p.amount)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Visit {
    pub id: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub start_time: String,
    pub end_time: String,
    pub services: Vec<VisitService>,
    pub cost: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub status: VisitStatus,
    pub payments: Vec<Payment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub treated_teeth: Option<Vec<u32>>,
    pub clinic_id: String,
    pub created_at: String,
    pub cash_amount: f64,
    pub ewallet_amount: f64,
}

impl Visit {
    pub fn is_cancelled(&self) -> bool {
        self.status == VisitStatus::Cancelled
    }

    pub fn paid(&self) -> f64 {
        PaymentTotals::of(&self.payments).total
    }

    /// Append `payment`, or replace the one with the same id, then refresh
    /// the per-method totals.
    pub fn add_payment(&mut self, mut payment: Payment) {
        payment.visit_id = self.id.clone();
        payment.amount = round2(payment.amount);
        match self.payments.iter_mut().find(|p| p.id == payment.id) {
            Some(existing) => *existing = payment,
            None => self.payments.push(payment),
        }
        self.recompute_payment_totals();
    }

    /// Returns the removed payment, if this visit held it.
    pub fn remove_payment(&mut self, payment_id: &str) -> Option<Payment> {
        let idx = self.payments.iter().position(|p| p.id == payment_id)?;
        let removed = self.payments.remove(idx);
        self.recompute_payment_totals();
        Some(removed)
    }

    pub fn recompute_payment_totals(&mut self) {
        let totals = PaymentTotals::of(&self.payments);
        self.cash_amount = totals.cash;
        self.ewallet_amount = totals.ewallet;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payment(id: &str, amount: f64, method: Option<PaymentMethod>) -> Payment {
        Payment {
            id: id.into(),
            amount,
            method,
            ..Payment::default()
        }
    }

    #[test]
    fn legacy_and_rich_services_read_the_same() {
        let v: Visit = serde_json::from_value(json!({
            "id": "visit_1",
            "services": ["service_a", {"serviceId": "service_b", "quantity": 2, "teeth": [11, 12]}]
        }))
        .unwrap();

        assert_eq!(v.services[0], VisitService::new("service_a"));
        assert_eq!(v.services[1].quantity, 2);
        assert_eq!(v.services[1].teeth, vec![11, 12]);

        let out = serde_json::to_value(&v).unwrap();
        assert_eq!(out["services"][0], json!({"serviceId": "service_a", "quantity": 1}));
    }

    #[test]
    fn totals_split_by_method() {
        let mut v = Visit {
            id: "visit_1".into(),
            cost: 50.0,
            ..Visit::default()
        };
        v.add_payment(payment("p1", 40.0, Some(PaymentMethod::Cash)));
        v.add_payment(payment("p2", 10.0, Some(PaymentMethod::Ewallet)));

        let totals = PaymentTotals::of(&v.payments);
        assert_eq!((totals.cash, totals.ewallet, totals.total), (40.0, 10.0, 50.0));
        assert_eq!((v.cash_amount, v.ewallet_amount), (40.0, 10.0));
        assert!(v.payments.iter().all(|p| p.visit_id == "visit_1"));
    }

    #[test]
    fn same_payment_id_replaces_and_removal_recomputes() {
        let mut v = Visit::default();
        v.add_payment(payment("p1", 40.0, Some(PaymentMethod::Cash)));
        v.add_payment(payment("p1", 25.456, Some(PaymentMethod::Cash)));
        assert_eq!(v.payments.len(), 1);
        assert_eq!(v.cash_amount, 25.46);

        assert!(v.remove_payment("nope").is_none());
        assert_eq!(v.remove_payment("p1").map(|p| p.amount), Some(25.46));
        assert_eq!(v.cash_amount, 0.0);
    }

    #[test]
    fn payments_without_method_count_only_in_total() {
        let totals = PaymentTotals::of(&[
            payment("a", 5.0, None),
            payment("b", 7.5, Some(PaymentMethod::Cash)),
        ]);
        assert_eq!(totals.cash, 7.5);
        assert_eq!(totals.ewallet, 0.0);
        assert_eq!(totals.total, 12.5);
    }
}
