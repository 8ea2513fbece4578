//! Clinic dashboard figures.
//!
//! Everything here is computed from already clinic-scoped lists; callers
//! are responsible for loading only one clinic's records.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::money::round2;
use crate::time::parse_date;
use crate::{Doctor, Patient, PaymentMethod, Service, Visit, VisitStatus};

pub const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyticsQuery {
    /// Inclusive first day.
    pub from: Option<NaiveDate>,
    /// Inclusive last day.
    pub to: Option<NaiveDate>,
    pub doctor_id: Option<String>,
}

impl AnalyticsQuery {
    fn has_window(&self) -> bool {
        self.from.is_some() || self.to.is_some()
    }

    /// Undated records only fall inside an open window.
    fn in_window(&self, day: Option<NaiveDate>) -> bool {
        match day {
            Some(d) => self.from.map_or(true, |f| d >= f) && self.to.map_or(true, |t| d <= t),
            None => !self.has_window(),
        }
    }

    fn wants_doctor(&self, doctor_id: &str) -> bool {
        self.doctor_id.as_deref().map_or(true, |d| d == doctor_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub visits: usize,
    /// Payments dated that day.
    pub revenue: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorStats {
    pub doctor_id: String,
    pub name: String,
    /// Non-cancelled visits.
    pub appointments: usize,
    /// Billed cost of those visits.
    pub revenue: f64,
    pub average_check: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceUsage {
    pub service_id: String,
    pub name: String,
    /// Summed quantities across non-cancelled visits.
    pub count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicSummary {
    pub patients_total: usize,
    /// Patients created inside the window; 0 without a window.
    pub new_patients: usize,
    pub visits_total: usize,
    pub visits_by_status: BTreeMap<String, usize>,
    pub billed: f64,
    pub collected: f64,
    pub payments_by_method: BTreeMap<String, f64>,
    pub daily: Vec<DailyPoint>,
    pub doctors: Vec<DoctorStats>,
    pub top_services: Vec<ServiceUsage>,
}

#[derive(Default)]
struct DayAcc {
    visits: usize,
    revenue: f64,
}

pub fn summarize(
    patients: &[Patient],
    visits: &[Visit],
    doctors: &[Doctor],
    services: &[Service],
    query: &AnalyticsQuery,
) -> ClinicSummary {
    let mut out = ClinicSummary {
        patients_total: patients.len(),
        new_patients: patients
            .iter()
            .filter(|p| query.has_window() && query.in_window(parse_date(&p.created_at)))
            .count(),
        ..ClinicSummary::default()
    };
    for status in [VisitStatus::Scheduled, VisitStatus::Completed, VisitStatus::Cancelled] {
        out.visits_by_status.insert(status.as_str().to_string(), 0);
    }

    let mut days: BTreeMap<NaiveDate, DayAcc> = BTreeMap::new();
    let mut per_doctor: BTreeMap<&str, (usize, f64)> = BTreeMap::new();
    let mut per_service: HashMap<&str, u32> = HashMap::new();

    for visit in visits.iter().filter(|v| query.wants_doctor(&v.doctor_id)) {
        let visit_day = parse_date(&visit.start_time);

        // Payments are windowed by their own date so money taken today for
        // an old visit still shows up today.
        for payment in &visit.payments {
            let paid_on = parse_date(&payment.date).or(visit_day);
            if !query.in_window(paid_on) {
                continue;
            }
            out.collected += payment.amount;
            let method = payment.method.map_or("unspecified", |m: PaymentMethod| m.as_str());
            *out.payments_by_method.entry(method.to_string()).or_default() += payment.amount;
            if let Some(day) = paid_on {
                days.entry(day).or_default().revenue += payment.amount;
            }
        }

        if !query.in_window(visit_day) {
            continue;
        }
        out.visits_total += 1;
        *out.visits_by_status
            .entry(visit.status.as_str().to_string())
            .or_default() += 1;
        if let Some(day) = visit_day {
            days.entry(day).or_default().visits += 1;
        }

        if visit.is_cancelled() {
            continue;
        }
        out.billed += visit.cost;
        let doc = per_doctor.entry(visit.doctor_id.as_str()).or_default();
        doc.0 += 1;
        doc.1 += visit.cost;
        for s in &visit.services {
            *per_service.entry(s.service_id.as_str()).or_default() += s.quantity;
        }
    }

    out.billed = round2(out.billed);
    out.collected = round2(out.collected);
    for v in out.payments_by_method.values_mut() {
        *v = round2(*v);
    }

    out.daily = days
        .into_iter()
        .map(|(date, acc)| DailyPoint {
            date,
            visits: acc.visits,
            revenue: round2(acc.revenue),
        })
        .collect();

    let doctor_name = |id: &str| {
        doctors
            .iter()
            .find(|d| d.id == id)
            .map_or_else(|| UNKNOWN.to_string(), |d| d.name.clone())
    };
    out.doctors = per_doctor
        .into_iter()
        .map(|(id, (appointments, revenue))| DoctorStats {
            doctor_id: id.to_string(),
            name: doctor_name(id),
            appointments,
            revenue: round2(revenue),
            average_check: if appointments == 0 {
                0.0
            } else {
                round2(revenue / appointments as f64)
            },
        })
        .collect();
    out.doctors.sort_by(|a, b| b.revenue.total_cmp(&a.revenue));

    let service_name = |id: &str| {
        services
            .iter()
            .find(|s| s.id == id)
            .map_or_else(|| UNKNOWN.to_string(), |s| s.name.clone())
    };
    out.top_services = per_service
        .into_iter()
        .map(|(id, count)| ServiceUsage {
            service_id: id.to_string(),
            name: service_name(id),
            count,
        })
        .collect();
    out.top_services
        .sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.service_id.cmp(&b.service_id)));

    out
}
