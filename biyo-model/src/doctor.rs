use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Doctor {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Calendar colour, e.g. `#4f46e5`.
    pub color: String,
    pub clinic_id: String,
    /// Login of the doctor, when they have one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}
