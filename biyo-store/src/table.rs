use std::fmt;

/// The logical tables of a clinic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Patients,
    Doctors,
    Services,
    Visits,
    Clinics,
    Users,
    Files,
}

impl Table {
    pub const ALL: [Table; 7] = [
        Table::Patients,
        Table::Doctors,
        Table::Services,
        Table::Visits,
        Table::Clinics,
        Table::Users,
        Table::Files,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Table::Patients => "patients",
            Table::Doctors => "doctors",
            Table::Services => "services",
            Table::Visits => "visits",
            Table::Clinics => "clinics",
            Table::Users => "users",
            Table::Files => "files",
        }
    }

    /// Tab title in the spreadsheet backend.
    pub fn sheet_name(&self) -> &'static str {
        match self {
            Table::Patients => "Patients",
            Table::Doctors => "Doctors",
            Table::Services => "Services",
            Table::Visits => "Visits",
            Table::Clinics => "Clinics",
            Table::Users => "Users",
            Table::Files => "Files",
        }
    }

    /// Key of the table's JSON array in a key-value backend.
    pub fn kv_key(&self, prefix: &str) -> String {
        format!("{prefix}:{}", self.name())
    }

    pub fn from_name(name: &str) -> Option<Table> {
        Table::ALL.into_iter().find(|t| t.name() == name)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_and_tabs() {
        assert_eq!(Table::Patients.kv_key("biyo"), "biyo:patients");
        assert_eq!(Table::Files.sheet_name(), "Files");
        assert_eq!(Table::from_name("visits"), Some(Table::Visits));
        assert_eq!(Table::from_name("payments"), None);
    }
}
