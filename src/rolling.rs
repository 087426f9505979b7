//! Trailing rolling-window sums over dense daily series.
//!
//! Sums are computed from a prefix-sum pass: O(N) total work per series
//! regardless of window size, never O(N·W) re-summation. The
//! `benches/rolling_windows.rs` benchmark pins this property.
//!
//! Partial-window policy: a date with fewer than W prior days sums over
//! however many days exist (minimum 1) instead of emitting a missing value.
//! This keeps the earliest snapshots of the padded range usable; callers
//! must treat early-date sums as shorter-than-W sums.

use crate::config::WindowConfig;
use crate::timeseries::DailySeries;

/// Trailing sum of `values` over a `window`-day window ending at and
/// including each position.
pub fn trailing_sum(values: &[i64], window: usize) -> Vec<i64> {
    debug_assert!(window > 0, "window size must be positive");

    let mut prefix = vec![0i64; values.len() + 1];
    for (i, &v) in values.iter().enumerate() {
        prefix[i + 1] = prefix[i] + v;
    }

    (0..values.len())
        .map(|i| prefix[i + 1] - prefix[(i + 1).saturating_sub(window)])
        .collect()
}

/// The per-entity rolling aggregates consumed by the row assembler.
#[derive(Debug, Clone)]
pub struct RollingWindows {
    pub sales_7d: Vec<i64>,
    pub sales_14d: Vec<i64>,
    pub sales_30d: Vec<i64>,
    pub views_7d: Vec<i64>,
    pub views_30d: Vec<i64>,
    pub add_to_carts_7d: Vec<i64>,
}

impl RollingWindows {
    pub fn compute(series: &DailySeries, windows: &WindowConfig) -> Self {
        let short = windows.window_7d as usize;
        let long = windows.window_30d as usize;
        Self {
            sales_7d: trailing_sum(&series.purchases, short),
            sales_14d: trailing_sum(&series.purchases, windows.window_14d as usize),
            sales_30d: trailing_sum(&series.purchases, long),
            views_7d: trailing_sum(&series.views, short),
            views_30d: trailing_sum(&series.views, long),
            add_to_carts_7d: trailing_sum(&series.add_to_carts, short),
        }
    }
}

/// Store-level rolling aggregates (short window only).
#[derive(Debug, Clone)]
pub struct GroupWindows {
    pub views_7d: Vec<i64>,
    pub purchases_7d: Vec<i64>,
}

impl GroupWindows {
    pub fn compute(series: &DailySeries, windows: &WindowConfig) -> Self {
        let short = windows.window_7d as usize;
        Self {
            views_7d: trailing_sum(&series.views, short),
            purchases_7d: trailing_sum(&series.purchases, short),
        }
    }
}
