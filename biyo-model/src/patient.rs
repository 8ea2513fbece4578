use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToothCondition {
    #[default]
    Healthy,
    Problem,
    Treating,
    Treated,
    Missing,
}

/// One entry of a patient's dental chart, keyed by FDI tooth number.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToothStatus {
    pub tooth_number: u32,
    pub status: ToothCondition,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Patient {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub email: String,
    /// ISO date as entered.
    pub date_of_birth: String,
    pub is_child: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub teeth: Vec<ToothStatus>,
    /// Service ids the patient is enrolled for.
    pub services: Vec<String>,
    /// Cached outstanding balance. The authoritative figure is
    /// [`crate::patient_balance`] over the patient's visits.
    pub balance: f64,
    pub clinic_id: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Patient {
    pub fn tooth(&self, number: u32) -> Option<ToothCondition> {
        self.teeth
            .iter()
            .find(|t| t.tooth_number == number)
            .map(|t| t.status)
    }

    /// Set one tooth's condition, adding it to the chart if absent.
    pub fn set_tooth(&mut self, number: u32, status: ToothCondition) {
        match self.teeth.iter_mut().find(|t| t.tooth_number == number) {
            Some(t) => t.status = status,
            None => self.teeth.push(ToothStatus {
                tooth_number: number,
                status,
            }),
        }
    }
}
