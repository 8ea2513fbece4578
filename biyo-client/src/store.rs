//! Offline-first facade over the API: reads come from the local cache,
//! writes go to the server first and then into the cache.

use std::path::PathBuf;
use std::sync::{Mutex, PoisonError, RwLock as StdRwLock};
use std::time::Instant;

use biyo_model::{
    default_services, new_id, patient_balance, round2, Clinic, Doctor, Patient, PatientFile,
    Payment, PaymentMethod, Service, User, Visit,
};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::breaker::{BreakerState, CircuitBreaker};
use crate::cache::{Collection, LocalCache};
use crate::config::ClientConfig;
use crate::error::{ApiError, ClientError, ClientResult};

/// Which part of the cache just changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataChange {
    Patients,
    Doctors,
    Services,
    Visits,
    Files,
    Users,
    Clinics,
    Auth,
}

type Slot<T> = fn(&mut LocalCache) -> &mut Collection<T>;

/// Failures that say the server is down rather than that it disliked the
/// request.
fn counts_against_breaker(e: &ApiError) -> bool {
    e.is_connectivity() || e.status().is_some_and(|s| s >= 500)
}

fn stamp(clinic_slot: &mut String, id_slot: &mut String, id_prefix: &str, clinic: Option<String>) -> ClientResult<()> {
    if clinic_slot.is_empty() {
        *clinic_slot = clinic.ok_or(ClientError::NoClinic)?;
    }
    if id_slot.is_empty() {
        *id_slot = new_id(id_prefix);
    }
    Ok(())
}

pub struct ClinicStore {
    api: ApiClient,
    cache: RwLock<LocalCache>,
    breaker: Mutex<CircuitBreaker>,
    current_user: StdRwLock<Option<User>>,
    cache_path: Option<PathBuf>,
    changes: broadcast::Sender<DataChange>,
}

impl ClinicStore {
    pub fn new(api: ApiClient, config: &ClientConfig) -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            api,
            cache: RwLock::new(LocalCache::default()),
            breaker: Mutex::new(CircuitBreaker::new(config.breaker_threshold, config.breaker_reset)),
            current_user: StdRwLock::new(None),
            cache_path: config.cache_path.clone(),
            changes,
        }
    }

    /// Build the client from `config` and load the offline snapshot, if
    /// one is configured.
    pub async fn open(config: &ClientConfig) -> ClientResult<Self> {
        let store = Self::new(ApiClient::new(config)?, config);
        if let Some(path) = &store.cache_path {
            *store.cache.write().await = LocalCache::load(path).await?;
        }
        Ok(store)
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DataChange> {
        self.changes.subscribe()
    }

    fn notify(&self, change: DataChange) {
        // Nobody listening is fine.
        let _ = self.changes.send(change);
    }

    pub fn breaker_state(&self) -> BreakerState {
        self.breaker.lock().unwrap_or_else(PoisonError::into_inner).state()
    }

    // --- session ---

    pub fn current_user(&self) -> Option<User> {
        self.current_user.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn current_clinic_id(&self) -> Option<String> {
        self.current_user()
            .map(|u| u.clinic_id)
            .filter(|c| !c.is_empty())
    }

    pub fn set_current_user(&self, user: Option<User>) {
        *self.current_user.write().unwrap_or_else(PoisonError::into_inner) = user;
        self.notify(DataChange::Auth);
    }

    pub async fn logout(&self) {
        self.set_current_user(None);
        self.cache.write().await.clear();
        self.persist().await;
    }

    fn clinic_or_current(&self, clinic_id: Option<&str>) -> Option<String> {
        clinic_id
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .or_else(|| self.current_clinic_id())
    }

    fn require_clinic(&self, clinic_id: Option<&str>) -> ClientResult<String> {
        self.clinic_or_current(clinic_id).ok_or(ClientError::NoClinic)
    }

    // --- cache plumbing ---

    async fn persist(&self) {
        let Some(path) = &self.cache_path else {
            return;
        };
        if let Err(e) = self.cache.read().await.save(path).await {
            warn!(path = %path.display(), error = %e, "could not write cache snapshot");
        }
    }

    async fn merge_into<T: biyo_model::Identified + Clone>(&self, slot: Slot<T>, rows: Vec<T>, change: DataChange) {
        let merged = slot(&mut *self.cache.write().await).merge(rows);
        debug!(?change, merged, "merged server snapshot");
        self.notify(change);
    }

    async fn put_into<T: biyo_model::Identified + Clone>(&self, slot: Slot<T>, record: T, change: DataChange) {
        slot(&mut *self.cache.write().await).put(record);
        self.persist().await;
        self.notify(change);
    }

    async fn remove_from<T: biyo_model::Identified + Clone>(&self, slot: Slot<T>, id: &str, change: DataChange) {
        slot(&mut *self.cache.write().await).remove(id);
        self.persist().await;
        self.notify(change);
    }

    // --- patients ---

    pub async fn patients(&self, clinic_id: Option<&str>) -> Vec<Patient> {
        let clinic = self.clinic_or_current(clinic_id);
        self.cache.read().await.patients.for_clinic(clinic.as_deref())
    }

    pub async fn fetch_patients(&self, clinic_id: Option<&str>) -> ClientResult<Vec<Patient>> {
        let clinic = self.require_clinic(clinic_id)?;
        let rows = self.api.get_patients(Some(&clinic)).await?;
        self.merge_into(|c| &mut c.patients, rows.clone(), DataChange::Patients).await;
        self.persist().await;
        Ok(rows)
    }

    pub async fn save_patient(&self, mut patient: Patient) -> ClientResult<Patient> {
        stamp(&mut patient.clinic_id, &mut patient.id, "patient", self.current_clinic_id())?;
        let saved = self.api.save_patient(&patient).await?;
        self.put_into(|c| &mut c.patients, saved.clone(), DataChange::Patients).await;
        Ok(saved)
    }

    /// The server also drops the patient's visits and files; the cache
    /// follows suit.
    pub async fn delete_patient(&self, patient_id: &str, clinic_id: Option<&str>) -> ClientResult<()> {
        let clinic = self.require_clinic(clinic_id)?;
        self.api.delete_patient(patient_id, &clinic).await?;
        {
            let mut cache = self.cache.write().await;
            cache.patients.remove(patient_id);
            for v in cache.visits.for_clinic(Some(&clinic)) {
                if v.patient_id == patient_id {
                    cache.visits.remove(&v.id);
                }
            }
            for f in cache.files.for_clinic(Some(&clinic)) {
                if f.patient_id == patient_id {
                    cache.files.remove(&f.id);
                }
            }
        }
        self.persist().await;
        self.notify(DataChange::Patients);
        Ok(())
    }

    // --- doctors ---

    pub async fn doctors(&self, clinic_id: Option<&str>) -> Vec<Doctor> {
        let clinic = self.clinic_or_current(clinic_id);
        self.cache.read().await.doctors.for_clinic(clinic.as_deref())
    }

    pub async fn fetch_doctors(&self, clinic_id: Option<&str>) -> ClientResult<Vec<Doctor>> {
        let clinic = self.require_clinic(clinic_id)?;
        let rows = self.api.get_doctors(Some(&clinic)).await?;
        self.merge_into(|c| &mut c.doctors, rows.clone(), DataChange::Doctors).await;
        self.persist().await;
        Ok(rows)
    }

    pub async fn save_doctor(&self, mut doctor: Doctor) -> ClientResult<Doctor> {
        stamp(&mut doctor.clinic_id, &mut doctor.id, "doctor", self.current_clinic_id())?;
        let saved = self.api.save_doctor(&doctor).await?;
        self.put_into(|c| &mut c.doctors, saved.clone(), DataChange::Doctors).await;
        Ok(saved)
    }

    pub async fn delete_doctor(&self, doctor_id: &str, clinic_id: Option<&str>) -> ClientResult<()> {
        let clinic = self.require_clinic(clinic_id)?;
        self.api.delete_doctor(doctor_id, &clinic).await?;
        self.remove_from(|c| &mut c.doctors, doctor_id, DataChange::Doctors).await;
        Ok(())
    }

    // --- services ---

    pub async fn services(&self, clinic_id: Option<&str>) -> Vec<Service> {
        let clinic = self.clinic_or_current(clinic_id);
        self.cache.read().await.services.for_clinic(clinic.as_deref())
    }

    pub async fn fetch_services(&self, clinic_id: Option<&str>) -> ClientResult<Vec<Service>> {
        let clinic = self.require_clinic(clinic_id)?;
        let rows = self.api.get_services(Some(&clinic)).await?;
        self.merge_into(|c| &mut c.services, rows.clone(), DataChange::Services).await;
        self.persist().await;
        Ok(rows)
    }

    pub async fn save_service(&self, mut service: Service) -> ClientResult<Service> {
        stamp(&mut service.clinic_id, &mut service.id, "service", self.current_clinic_id())?;
        let saved = self.api.save_service(&service).await?;
        self.put_into(|c| &mut c.services, saved.clone(), DataChange::Services).await;
        Ok(saved)
    }

    pub async fn delete_service(&self, service_id: &str, clinic_id: Option<&str>) -> ClientResult<()> {
        let clinic = self.require_clinic(clinic_id)?;
        self.api.delete_service(service_id, &clinic).await?;
        self.remove_from(|c| &mut c.services, service_id, DataChange::Services).await;
        Ok(())
    }

    /// Seed the current clinic's price list with the standard treatments,
    /// unless it already has services. Returns how many were created.
    pub async fn initialize_default_services(&self) -> ClientResult<usize> {
        let Some(clinic) = self.current_clinic_id() else {
            return Ok(0);
        };
        if !self.services(Some(&clinic)).await.is_empty() {
            return Ok(0);
        }

        let mut created = 0;
        for service in default_services(&clinic) {
            self.save_service(service).await?;
            created += 1;
        }
        info!(clinic = %clinic, created, "default services created");
        Ok(created)
    }

    // --- visits & payments ---

    pub async fn visits(&self, clinic_id: Option<&str>) -> Vec<Visit> {
        let clinic = self.clinic_or_current(clinic_id);
        self.cache.read().await.visits.for_clinic(clinic.as_deref())
    }

    pub async fn fetch_visits(&self, clinic_id: Option<&str>) -> ClientResult<Vec<Visit>> {
        let clinic = self.require_clinic(clinic_id)?;
        let rows = self.api.get_visits(Some(&clinic)).await?;
        self.merge_into(|c| &mut c.visits, rows.clone(), DataChange::Visits).await;
        self.persist().await;
        Ok(rows)
    }

    pub async fn save_visit(&self, mut visit: Visit) -> ClientResult<Visit> {
        stamp(&mut visit.clinic_id, &mut visit.id, "visit", self.current_clinic_id())?;
        let saved = self.api.save_visit(&visit).await?;
        self.put_into(|c| &mut c.visits, saved.clone(), DataChange::Visits).await;
        Ok(saved)
    }

    pub async fn delete_visit(&self, visit_id: &str, clinic_id: Option<&str>) -> ClientResult<()> {
        let clinic = self.require_clinic(clinic_id)?;
        self.api.delete_visit(visit_id, &clinic).await?;
        self.remove_from(|c| &mut c.visits, visit_id, DataChange::Visits).await;
        Ok(())
    }

    /// Record a payment, then re-read the clinic's visits so the cached
    /// totals match the server's.
    pub async fn add_payment(&self, visit_id: &str, amount: f64, method: PaymentMethod) -> ClientResult<Payment> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(ClientError::InvalidAmount);
        }
        let clinic = self.current_clinic_id();
        let payment = self
            .api
            .add_payment(clinic.as_deref(), visit_id, round2(amount), Some(method), None)
            .await?;

        if clinic.is_some() {
            self.fetch_visits(clinic.as_deref()).await?;
        }
        Ok(payment)
    }

    pub async fn delete_payment(&self, payment_id: &str) -> ClientResult<()> {
        let clinic = self.current_clinic_id();
        self.api.delete_payment(clinic.as_deref(), payment_id).await?;
        if clinic.is_some() {
            self.fetch_visits(clinic.as_deref()).await?;
        }
        Ok(())
    }

    /// What the patient still owes the current clinic, from cached visits.
    /// Zero when nobody is signed in.
    pub async fn patient_balance(&self, patient_id: &str) -> f64 {
        let Some(clinic) = self.current_clinic_id() else {
            return 0.0;
        };
        let visits = self.visits(Some(&clinic)).await;
        patient_balance(patient_id, &clinic, &visits)
    }

    /// Store the derived balance on the patient record. Writes only when
    /// the value changed; returns the new balance when it did.
    pub async fn refresh_patient_balance(&self, patient_id: &str) -> ClientResult<Option<f64>> {
        let balance = self.patient_balance(patient_id).await;
        let cached = self.cache.read().await.patients.get(patient_id).cloned();
        let Some(mut patient) = cached else {
            return Ok(None);
        };
        if round2(patient.balance) == balance {
            return Ok(None);
        }

        patient.balance = balance;
        self.save_patient(patient).await?;
        Ok(Some(balance))
    }

    // --- files ---

    pub async fn files(&self, patient_id: Option<&str>, clinic_id: Option<&str>) -> Vec<PatientFile> {
        let clinic = self.clinic_or_current(clinic_id);
        let mut files = self.cache.read().await.files.for_clinic(clinic.as_deref());
        if let Some(patient) = patient_id {
            files.retain(|f| f.patient_id == patient);
        }
        files
    }

    pub async fn fetch_files(&self, patient_id: Option<&str>, clinic_id: Option<&str>) -> ClientResult<Vec<PatientFile>> {
        let clinic = self.require_clinic(clinic_id)?;
        let rows = self.api.get_files(patient_id, Some(&clinic)).await?;
        self.merge_into(|c| &mut c.files, rows.clone(), DataChange::Files).await;
        self.persist().await;
        Ok(rows)
    }

    pub async fn save_file(&self, mut file: PatientFile) -> ClientResult<PatientFile> {
        stamp(&mut file.clinic_id, &mut file.id, "file", self.current_clinic_id())?;
        let saved = self.api.save_file(&file).await?;
        self.put_into(|c| &mut c.files, saved.clone(), DataChange::Files).await;
        Ok(saved)
    }

    pub async fn delete_file(&self, file_id: &str, clinic_id: Option<&str>) -> ClientResult<()> {
        let clinic = self.require_clinic(clinic_id)?;
        self.api.delete_file(file_id, &clinic).await?;
        self.remove_from(|c| &mut c.files, file_id, DataChange::Files).await;
        Ok(())
    }

    // --- users & clinics ---

    pub async fn users(&self, clinic_id: Option<&str>) -> Vec<User> {
        let clinic = self.clinic_or_current(clinic_id);
        self.cache.read().await.users.for_clinic(clinic.as_deref())
    }

    pub async fn fetch_users(&self, clinic_id: Option<&str>) -> ClientResult<Vec<User>> {
        let clinic = self.require_clinic(clinic_id)?;
        let rows = self.api.get_users(Some(&clinic)).await?;
        self.merge_into(|c| &mut c.users, rows.clone(), DataChange::Users).await;
        self.persist().await;
        Ok(rows)
    }

    pub async fn save_user(&self, mut user: User) -> ClientResult<User> {
        if user.id.is_empty() {
            user.id = new_id("user");
        }
        let saved = self.api.save_user(&user).await?;
        self.put_into(|c| &mut c.users, saved.clone(), DataChange::Users).await;
        Ok(saved)
    }

    pub async fn user_by_email(&self, email: &str) -> Option<User> {
        self.cache.read().await.users.find(|u| u.email == email).cloned()
    }

    pub async fn fetch_user_by_email(&self, email: &str) -> ClientResult<Option<User>> {
        let user = self.api.get_user_by_email(email).await?;
        if let Some(u) = &user {
            self.put_into(|c| &mut c.users, u.clone(), DataChange::Users).await;
        }
        Ok(user)
    }

    pub async fn clinics(&self) -> Vec<Clinic> {
        self.cache.read().await.clinics.all()
    }

    pub async fn clinic_by_id(&self, clinic_id: &str) -> Option<Clinic> {
        self.cache.read().await.clinics.get(clinic_id).cloned()
    }

    pub async fn fetch_clinics(&self) -> ClientResult<Vec<Clinic>> {
        let rows = self.api.get_clinics().await?;
        self.merge_into(|c| &mut c.clinics, rows.clone(), DataChange::Clinics).await;
        self.persist().await;
        Ok(rows)
    }

    pub async fn fetch_clinic_by_id(&self, clinic_id: &str) -> ClientResult<Option<Clinic>> {
        let clinic = self.api.get_clinic_by_id(clinic_id).await?;
        if let Some(c) = &clinic {
            self.put_into(|cache| &mut cache.clinics, c.clone(), DataChange::Clinics).await;
        }
        Ok(clinic)
    }

    pub async fn save_clinic(&self, mut clinic: Clinic) -> ClientResult<Clinic> {
        if clinic.id.is_empty() {
            clinic.id = new_id("clinic");
        }
        let saved = self.api.save_clinic(&clinic).await?;
        self.put_into(|c| &mut c.clinics, saved.clone(), DataChange::Clinics).await;
        Ok(saved)
    }

    // --- sync ---

    async fn pull_all(&self, clinic: &str) -> Result<(), ApiError> {
        let patients = self.api.get_patients(Some(clinic)).await?;
        let doctors = self.api.get_doctors(Some(clinic)).await?;
        let services = self.api.get_services(Some(clinic)).await?;
        let visits = self.api.get_visits(Some(clinic)).await?;
        let files = self.api.get_files(None, Some(clinic)).await?;
        let users = self.api.get_users(Some(clinic)).await?;

        self.merge_into(|c| &mut c.patients, patients, DataChange::Patients).await;
        self.merge_into(|c| &mut c.doctors, doctors, DataChange::Doctors).await;
        self.merge_into(|c| &mut c.services, services, DataChange::Services).await;
        self.merge_into(|c| &mut c.visits, visits, DataChange::Visits).await;
        self.merge_into(|c| &mut c.files, files, DataChange::Files).await;
        self.merge_into(|c| &mut c.users, users, DataChange::Users).await;
        Ok(())
    }

    /// Pull every collection of the current clinic into the cache.
    ///
    /// Returns `Ok(false)` without calling the server when nobody is
    /// signed in or the breaker is open.
    pub async fn sync_once(&self) -> ClientResult<bool> {
        let Some(clinic) = self.current_clinic_id() else {
            return Ok(false);
        };
        let allowed = self
            .breaker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .allow(Instant::now());
        if !allowed {
            debug!("sync skipped, breaker open");
            return Ok(false);
        }

        let outcome = self.pull_all(&clinic).await;
        {
            let mut breaker = self.breaker.lock().unwrap_or_else(PoisonError::into_inner);
            match &outcome {
                Err(e) if counts_against_breaker(e) => breaker.record_failure(Instant::now()),
                _ => breaker.record_success(),
            }
        }
        outcome?;

        self.persist().await;
        Ok(true)
    }
}
