//! Typed calls against the clinic REST API.

use biyo_model::{
    AnalyticsQuery, Clinic, ClinicSummary, Doctor, Patient, PatientFile, Payment, PaymentMethod,
    Service, User, Visit,
};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{error_message, ApiError};

type Query<'a> = Vec<(&'a str, String)>;

/// Non-empty values only, the way the server expects optional filters.
fn query<'a>(pairs: &[(&'a str, Option<&str>)]) -> Query<'a> {
    pairs
        .iter()
        .filter_map(|(k, v)| v.filter(|s| !s.is_empty()).map(|s| (*k, s.to_string())))
        .collect()
}

/// Rows that do not read as `T` are skipped with a warning.
fn decode_rows<T: DeserializeOwned>(path: &str, rows: Vec<Value>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match serde_json::from_value(row) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(path, error = %e, "skipping unreadable record");
                None
            }
        })
        .collect()
}

/// Lookups by `id` or `email` answer one record, `null`, or (from older
/// servers) a list.
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(Option<T>),
}

impl<T> OneOrMany<T> {
    fn first(self) -> Option<T> {
        match self {
            OneOrMany::Many(v) => v.into_iter().next(),
            OneOrMany::One(v) => v,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::from_reqwest(&config.api_url, e))?;
        Ok(Self::with_client(http, config.api_url.clone()))
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send(&self, url: &str, builder: RequestBuilder) -> Result<Value, ApiError> {
        let res = builder
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(url, e))?;

        let status = res.status();
        let is_json = res
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("application/json"));
        let text = res.text().await.map_err(|e| ApiError::from_reqwest(url, e))?;

        let body = if text.is_empty() {
            Value::Null
        } else if is_json {
            serde_json::from_str(&text).map_err(|e| ApiError::Decode {
                url: url.to_string(),
                message: e.to_string(),
            })?
        } else {
            Value::String(text)
        };

        if !status.is_success() {
            let fallback = format!("API request failed with status {}", status.as_u16());
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: error_message(&body, &fallback),
                body,
            });
        }
        Ok(body)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: Query<'_>,
        body: Option<Value>,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        debug!(method = %method, url = %url, "api call");

        let mut builder = self.http.request(method, &url).query(&query);
        if let Some(body) = body {
            builder = builder.json(&body);
        }
        let value = self.send(&url, builder).await?;
        serde_json::from_value(value).map_err(|e| ApiError::Decode {
            url,
            message: e.to_string(),
        })
    }

    async fn list<T: DeserializeOwned>(&self, path: &str, query: Query<'_>) -> Result<Vec<T>, ApiError> {
        let rows: Vec<Value> = self.call(Method::GET, path, query, None).await?;
        Ok(decode_rows(path, rows))
    }

    async fn save<T: Serialize + DeserializeOwned>(
        &self,
        path: &str,
        record: &T,
        clinic_id: Option<&str>,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_value(record).map_err(|e| ApiError::Decode {
            url: self.url(path),
            message: e.to_string(),
        })?;
        self.call(Method::POST, path, query(&[("clinicId", clinic_id)]), Some(body))
            .await
    }

    async fn delete(&self, path: &str, id: &str, clinic_id: &str) -> Result<(), ApiError> {
        let q = query(&[("id", Some(id)), ("clinicId", Some(clinic_id))]);
        let _: Value = self.call(Method::DELETE, path, q, None).await?;
        Ok(())
    }

    pub async fn get_patients(&self, clinic_id: Option<&str>) -> Result<Vec<Patient>, ApiError> {
        self.list("/patients", query(&[("clinicId", clinic_id)])).await
    }

    pub async fn save_patient(&self, patient: &Patient) -> Result<Patient, ApiError> {
        self.save("/patients", patient, Some(&patient.clinic_id)).await
    }

    pub async fn delete_patient(&self, id: &str, clinic_id: &str) -> Result<(), ApiError> {
        self.delete("/patients", id, clinic_id).await
    }

    pub async fn get_doctors(&self, clinic_id: Option<&str>) -> Result<Vec<Doctor>, ApiError> {
        self.list("/doctors", query(&[("clinicId", clinic_id)])).await
    }

    pub async fn save_doctor(&self, doctor: &Doctor) -> Result<Doctor, ApiError> {
        self.save("/doctors", doctor, Some(&doctor.clinic_id)).await
    }

    pub async fn delete_doctor(&self, id: &str, clinic_id: &str) -> Result<(), ApiError> {
        self.delete("/doctors", id, clinic_id).await
    }

    pub async fn get_services(&self, clinic_id: Option<&str>) -> Result<Vec<Service>, ApiError> {
        self.list("/services", query(&[("clinicId", clinic_id)])).await
    }

    pub async fn save_service(&self, service: &Service) -> Result<Service, ApiError> {
        self.save("/services", service, Some(&service.clinic_id)).await
    }

    pub async fn delete_service(&self, id: &str, clinic_id: &str) -> Result<(), ApiError> {
        self.delete("/services", id, clinic_id).await
    }

    pub async fn get_visits(&self, clinic_id: Option<&str>) -> Result<Vec<Visit>, ApiError> {
        self.list("/visits", query(&[("clinicId", clinic_id)])).await
    }

    pub async fn save_visit(&self, visit: &Visit) -> Result<Visit, ApiError> {
        self.save("/visits", visit, Some(&visit.clinic_id)).await
    }

    pub async fn delete_visit(&self, id: &str, clinic_id: &str) -> Result<(), ApiError> {
        self.delete("/visits", id, clinic_id).await
    }

    pub async fn get_files(
        &self,
        patient_id: Option<&str>,
        clinic_id: Option<&str>,
    ) -> Result<Vec<PatientFile>, ApiError> {
        self.list("/files", query(&[("patientId", patient_id), ("clinicId", clinic_id)]))
            .await
    }

    pub async fn save_file(&self, file: &PatientFile) -> Result<PatientFile, ApiError> {
        self.save("/files", file, Some(&file.clinic_id)).await
    }

    pub async fn delete_file(&self, id: &str, clinic_id: &str) -> Result<(), ApiError> {
        self.delete("/files", id, clinic_id).await
    }

    pub async fn get_users(&self, clinic_id: Option<&str>) -> Result<Vec<User>, ApiError> {
        self.list("/users", query(&[("clinicId", clinic_id)])).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        let found: OneOrMany<User> = self
            .call(Method::GET, "/users", query(&[("email", Some(email))]), None)
            .await?;
        Ok(found.first())
    }

    pub async fn save_user(&self, user: &User) -> Result<User, ApiError> {
        self.save("/users", user, Some(&user.clinic_id)).await
    }

    pub async fn get_clinics(&self) -> Result<Vec<Clinic>, ApiError> {
        self.list("/clinics", Vec::new()).await
    }

    pub async fn get_clinic_by_id(&self, id: &str) -> Result<Option<Clinic>, ApiError> {
        let found: OneOrMany<Clinic> = self
            .call(Method::GET, "/clinics", query(&[("id", Some(id))]), None)
            .await?;
        Ok(found.first())
    }

    pub async fn save_clinic(&self, clinic: &Clinic) -> Result<Clinic, ApiError> {
        self.save("/clinics", clinic, None).await
    }

    pub async fn add_payment(
        &self,
        clinic_id: Option<&str>,
        visit_id: &str,
        amount: f64,
        method: Option<PaymentMethod>,
        date: Option<&str>,
    ) -> Result<Payment, ApiError> {
        let body = json!({
            "visitId": visit_id,
            "amount": amount,
            "method": method,
            "date": date,
        });
        self.call(Method::POST, "/payments", query(&[("clinicId", clinic_id)]), Some(body))
            .await
    }

    pub async fn delete_payment(&self, clinic_id: Option<&str>, payment_id: &str) -> Result<(), ApiError> {
        let path = format!("/payments/{payment_id}");
        let _: Value = self
            .call(Method::DELETE, &path, query(&[("clinicId", clinic_id)]), None)
            .await?;
        Ok(())
    }

    pub async fn analytics_summary(
        &self,
        clinic_id: &str,
        filter: &AnalyticsQuery,
    ) -> Result<ClinicSummary, ApiError> {
        let from = filter.from.map(|d| d.to_string());
        let to = filter.to.map(|d| d.to_string());
        let q = query(&[
            ("clinicId", Some(clinic_id)),
            ("from", from.as_deref()),
            ("to", to.as_deref()),
            ("doctorId", filter.doctor_id.as_deref()),
        ]);
        self.call(Method::GET, "/analytics/summary", q, None).await
    }

    /// The clinic's patients as CSV text.
    pub async fn export_patients_csv(&self, clinic_id: &str, text: Option<&str>) -> Result<String, ApiError> {
        let url = self.url("/exports/patients");
        let builder = self
            .http
            .get(&url)
            .query(&query(&[("clinicId", Some(clinic_id)), ("q", text)]));
        match self.send(&url, builder).await? {
            Value::String(csv) => Ok(csv),
            Value::Null => Ok(String::new()),
            other => Err(ApiError::Decode {
                url,
                message: format!("expected CSV text, got {other}"),
            }),
        }
    }

    pub async fn health(&self) -> Result<bool, ApiError> {
        let reply: Value = self.call(Method::GET, "/health", Vec::new(), None).await?;
        Ok(reply.get("ok").and_then(Value::as_bool).unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_values_are_dropped() {
        let q = query(&[("clinicId", Some("c1")), ("patientId", None), ("q", Some(""))]);
        assert_eq!(q, vec![("clinicId", "c1".to_string())]);
    }

    #[test]
    fn single_lookups_accept_every_shape() {
        let one: OneOrMany<Clinic> = serde_json::from_value(json!({ "id": "c1", "name": "A" })).unwrap();
        assert_eq!(one.first().map(|c| c.id), Some("c1".to_string()));

        let none: OneOrMany<Clinic> = serde_json::from_value(Value::Null).unwrap();
        assert!(none.first().is_none());

        let many: OneOrMany<Clinic> = serde_json::from_value(json!([{ "id": "c2" }, { "id": "c3" }])).unwrap();
        assert_eq!(many.first().map(|c| c.id), Some("c2".to_string()));

        let empty: OneOrMany<Clinic> = serde_json::from_value(json!([])).unwrap();
        assert!(empty.first().is_none());
    }

    #[test]
    fn base_url_loses_its_trailing_slash() {
        let api = ApiClient::with_client(Client::new(), "http://localhost:4000/api/");
        assert_eq!(api.url("/patients"), "http://localhost:4000/api/patients");
    }

    #[test]
    fn unreadable_rows_are_skipped() {
        let rows = vec![
            json!({ "id": "p1", "clinicId": "c1", "name": "Aigerim" }),
            json!({ "id": "p2", "clinicId": "c1", "phone": null }),
            json!("not a record"),
        ];
        let patients: Vec<Patient> = decode_rows("/patients", rows);
        assert_eq!(patients.len(), 1);
        assert_eq!(patients[0].id, "p1");
    }
}
