/// Round to cents, halves away from zero. Never returns `-0.0`.
pub fn round2(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0 + 0.0
}

/// Sum then round once, so the rounding error of each term does not add up.
pub fn sum2<I: IntoIterator<Item = f64>>(amounts: I) -> f64 {
    round2(amounts.into_iter().sum())
}
