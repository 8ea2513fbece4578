use serde::{Deserialize, Serialize};

use crate::Patient;

/// Free-text patient filter, matched case-insensitively against name,
/// phone and email.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientQuery {
    #[serde(rename = "q", default)]
    pub text: Option<String>,
}

impl PatientQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }

    pub fn matches(&self, patient: &Patient) -> bool {
        let Some(needle) = self.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) else {
            return true;
        };
        let needle = needle.to_lowercase();
        [&patient.name, &patient.phone, &patient.email]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }

    pub fn apply<'a>(&self, patients: &'a [Patient]) -> Vec<&'a Patient> {
        patients.iter().filter(|p| self.matches(p)).collect()
    }
}

const COLUMNS: [&str; 11] = [
    "id",
    "name",
    "phone",
    "email",
    "dateOfBirth",
    "isChild",
    "address",
    "notes",
    "balance",
    "createdAt",
    "updatedAt",
];

fn quote(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn push_row<I, S>(out: &mut String, fields: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let row: Vec<String> = fields.into_iter().map(|f| quote(f.as_ref())).collect();
    out.push_str(&row.join(","));
    out.push_str("\r\n");
}

/// RFC 4180 CSV: a header row, then one row per patient in input order.
pub fn patients_csv<'a, I>(patients: I) -> String
where
    I: IntoIterator<Item = &'a Patient>,
{
    let mut out = String::new();
    push_row(&mut out, COLUMNS);
    for p in patients {
        push_row(
            &mut out,
            [
                p.id.clone(),
                p.name.clone(),
                p.phone.clone(),
                p.email.clone(),
                p.date_of_birth.clone(),
                p.is_child.to_string(),
                p.address.clone().unwrap_or_default(),
                p.notes.clone().unwrap_or_default(),
                p.balance.to_string(),
                p.created_at.clone(),
                p.updated_at.clone(),
            ],
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient(id: &str, name: &str, phone: &str) -> Patient {
        Patient {
            id: id.into(),
            name: name.into(),
            phone: phone.into(),
            ..Patient::default()
        }
    }

    #[test]
    fn query_matches_name_phone_or_email() {
        let mut a = patient("1", "Dana Akhmetova", "+7 701 111");
        a.email = "dana@mail.kz".into();
        let b = patient("2", "Erlan", "+7 702 222");
        let list = vec![a, b];

        assert_eq!(PatientQuery::new("dana").apply(&list).len(), 1);
        assert_eq!(PatientQuery::new("MAIL.KZ").apply(&list).len(), 1);
        assert_eq!(PatientQuery::new("+7 70").apply(&list).len(), 2);
        assert_eq!(PatientQuery::new("   ").apply(&list).len(), 2);
        assert_eq!(PatientQuery::default().apply(&list).len(), 2);
    }

    #[test]
    fn csv_has_one_row_per_patient_and_quotes_when_needed() {
        let mut tricky = patient("2", "Smith, \"Jo\"", "555");
        tricky.notes = Some("line1\nline2".into());
        let list = vec![patient("1", "Aigerim", "777"), tricky];

        let csv = patients_csv(&list);
        let lines: Vec<&str> = csv.split("\r\n").filter(|l| !l.is_empty()).collect();
        assert_eq!(lines[0], COLUMNS.join(","));
        assert!(lines[1].starts_with("1,Aigerim,777,"));
        assert!(csv.contains("\"Smith, \"\"Jo\"\"\""));
        assert!(csv.contains("\"line1\nline2\""));
        // header + two records
        assert_eq!(csv.matches("\r\n").count(), 3);
    }
}
