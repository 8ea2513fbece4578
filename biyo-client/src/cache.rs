//! In-memory mirror of the server's tables with an optional JSON snapshot
//! on disk for offline starts.

use std::collections::BTreeMap;
use std::path::Path;

use biyo_model::{ClinicScoped, Clinic, Doctor, Identified, Patient, PatientFile, Service, User, Visit};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ClientResult;

/// Records of one kind keyed by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Collection<T> {
    items: BTreeMap<String, T>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            items: BTreeMap::new(),
        }
    }
}

impl<T: Identified + Clone> Collection<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.items.get(id)
    }

    pub fn put(&mut self, record: T) {
        self.items.insert(record.id().to_string(), record);
    }

    pub fn remove(&mut self, id: &str) -> Option<T> {
        self.items.remove(id)
    }

    /// Apply a server snapshot: server records replace local ones with
    /// the same id; records only known locally stay.
    pub fn merge(&mut self, snapshot: Vec<T>) -> usize {
        let n = snapshot.len();
        for record in snapshot {
            self.put(record);
        }
        n
    }

    pub fn all(&self) -> Vec<T> {
        self.items.values().cloned().collect()
    }

    pub fn find<F>(&self, predicate: F) -> Option<&T>
    where
        F: Fn(&T) -> bool,
    {
        self.items.values().find(|r| predicate(r))
    }
}

impl<T: Identified + ClinicScoped + Clone> Collection<T> {
    /// Records of `clinic_id`, or every record when no clinic is given.
    pub fn for_clinic(&self, clinic_id: Option<&str>) -> Vec<T> {
        self.items
            .values()
            .filter(|r| clinic_id.map_or(true, |c| r.clinic_id() == c))
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalCache {
    pub patients: Collection<Patient>,
    pub doctors: Collection<Doctor>,
    pub services: Collection<Service>,
    pub visits: Collection<Visit>,
    pub files: Collection<PatientFile>,
    pub users: Collection<User>,
    pub clinics: Collection<Clinic>,
}

impl LocalCache {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Read a snapshot. A missing file is an empty cache.
    pub async fn load(path: &Path) -> ClientResult<Self> {
        match tokio::fs::read(path).await {
            Ok(bytes) => {
                let cache: Self = serde_json::from_slice(&bytes)?;
                debug!(path = %path.display(), patients = cache.patients.len(), "cache snapshot loaded");
                Ok(cache)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Written to a sibling temp file, then renamed into place.
    pub async fn save(&self, path: &Path) -> ClientResult<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec(self)?).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}
