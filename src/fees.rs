// src/fees.rs

/// Platform commission applied when nothing else is configured.
pub const DEFAULT_COMMISSION_PERCENT: f64 = 12.5;

/// Smallest accepted tip, in minor currency units.
pub const DEFAULT_MIN_TIP_MINOR: i64 = 100;

/// Process-wide billing configuration. Read from the environment once at
/// startup and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct BillingConfig {
    pub commission_percent: f64,
    pub min_tip_minor: i64,
    pub currency: String,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            commission_percent: DEFAULT_COMMISSION_PERCENT,
            min_tip_minor: DEFAULT_MIN_TIP_MINOR,
            currency: "USD".to_string(),
        }
    }
}

/// Splits a gross amount into (platform fee, creator payout).
///
/// The fee is rounded half-up; the payout absorbs the remainder, so
/// `fee + payout == gross` exactly for every input.
pub fn compute_split(gross_minor: i64, rate_percent: f64) -> (i64, i64) {
    let fee = (gross_minor as f64 * rate_percent / 100.0).round() as i64;
    let payout = gross_minor - fee;
    (fee, payout)
}
