use crate::money::{round2, sum2};
use crate::Visit;

/// Outstanding amount for a patient in one clinic: the cost of every
/// non-cancelled visit less the payments made on those visits, floored at 0.
pub fn patient_balance(patient_id: &str, clinic_id: &str, visits: &[Visit]) -> f64 {
    let owed = visits
        .iter()
        .filter(|v| v.patient_id == patient_id && v.clinic_id == clinic_id && !v.is_cancelled());

    let cost = sum2(owed.clone().map(|v| v.cost));
    let paid = sum2(owed.map(Visit::paid));
    round2((cost - paid).max(0.0))
}
