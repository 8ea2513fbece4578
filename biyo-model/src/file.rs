use serde::{Deserialize, Serialize};

/// An attachment on a patient record. `file` is an opaque payload
/// (typically a data URL) that is stored and returned untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PatientFile {
    pub id: String,
    pub patient_id: String,
    pub name: String,
    pub file: String,
    pub clinic_id: String,
    pub uploaded_at: String,
}
