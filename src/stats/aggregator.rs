use serde::Serialize;
use time::{Date, Duration};
use tracing::debug;

use crate::store::Store;

/// Raw counters reduced by the store in a single counting pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdherenceCounts {
    pub total_medicines: i64,
    pub taken: i64,
    pub missed: i64,
    pub window_taken: i64,
    pub window_total: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_medicines: i64,
    pub total_doses_taken: i64,
    pub total_doses_missed: i64,
    pub adherence_rate: f64,
}

/// Percentage of taken records, rounded to two decimals. Zero when there is
/// nothing to divide by.
pub fn adherence_rate(taken: i64, total: i64) -> f64 {
    if total <= 0 || taken <= 0 {
        return 0.0;
    }
    let taken = taken.min(total);
    let pct = taken as f64 * 100.0 / total as f64;
    (pct * 100.0).round() / 100.0
}

impl From<AdherenceCounts> for Stats {
    fn from(c: AdherenceCounts) -> Self {
        Self {
            total_medicines: c.total_medicines,
            total_doses_taken: c.taken,
            total_doses_missed: c.missed,
            adherence_rate: adherence_rate(c.window_taken, c.window_total),
        }
    }
}

/// Totals are all-time; only the rate is restricted to the trailing
/// `window_days` ending on `today`.
pub async fn compute_stats(
    store: &dyn Store,
    user_id: i64,
    today: Date,
    window_days: i64,
) -> anyhow::Result<Stats> {
    let window_start = today
        .checked_sub(Duration::days(window_days))
        .ok_or_else(|| anyhow::anyhow!("stats window of {window_days} days is out of range"))?;
    let counts = store.adherence_counts(user_id, window_start).await?;
    debug!(user_id, ?counts, %window_start, "adherence counts");
    Ok(counts.into())
}
