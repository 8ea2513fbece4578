use chrono::Utc;
use uuid::Uuid;

/// `{prefix}_{unix millis}_{6 random chars}`, e.g. `patient_1718000000000_k3j9x1`.
pub fn new_id(prefix: &str) -> String {
    let millis = Utc::now().timestamp_millis();
    let rand = Uuid::new_v4().simple().to_string();
    format!("{prefix}_{millis}_{}", &rand[..6])
}

/// Current time as RFC 3339 with millisecond precision and a `Z` suffix.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
