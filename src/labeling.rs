//! Forward-looking stockout label generation.
//!
//! For a snapshot date D and horizon H, the demand window is `(D, D+H]` —
//! strictly after D, inclusive of D+H. Summing from D itself would leak
//! same-day information into the label; the exclusive lower bound is the
//! lookahead-bias guard and is pinned by tests.
//!
//! The label compares forward demand against supply known at D:
//! `stockout = 1` iff the forward purchase sum exceeds the point-in-time
//! inventory at D.
//!
//! # Truncated windows
//!
//! When `D + H` extends past the last date for which event data was loaded,
//! the forward sum is necessarily partial. Such labels are never silently
//! treated as full sums: every label carries a `truncated` flag, and the
//! configured [`TruncationPolicy`] decides whether tagged rows are kept
//! (`Tag`, the default — the consumer filters) or dropped from the output
//! entirely (`Exclude`).

use serde::{Deserialize, Serialize};

/// What to do with rows whose forward window passes the end of loaded data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TruncationPolicy {
    /// Emit the row with `label_truncated = true` and let the label
    /// consumer decide.
    #[default]
    Tag,

    /// Drop the row during assembly.
    Exclude,
}

/// A computed label for one (entity, snapshot date).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockoutLabel {
    /// Purchases summed over `(D, D+H]`, clipped to the loaded range.
    pub future_sales: i64,
    /// Demand exceeds supply: `future_sales > inventory at D`.
    pub stockout: bool,
    /// The window passed the end of loaded data; `future_sales` is partial.
    pub truncated: bool,
}

/// Labeler over one entity's dense daily purchase series.
///
/// Built once per entity from a prefix-sum pass; each label is then O(1).
#[derive(Debug, Clone)]
pub struct LabelGenerator {
    prefix: Vec<i64>,
    horizon: usize,
}

impl LabelGenerator {
    /// `purchases` is the calendar-aligned daily purchase series (padding
    /// included); `horizon` is the label horizon in days.
    pub fn new(purchases: &[i64], horizon: usize) -> Self {
        let mut prefix = vec![0i64; purchases.len() + 1];
        for (i, &v) in purchases.iter().enumerate() {
            prefix[i + 1] = prefix[i] + v;
        }
        Self { prefix, horizon }
    }

    /// Label for the snapshot at axis `index` with the given point-in-time
    /// inventory.
    pub fn label_at(&self, index: usize, inventory_qty: i64) -> StockoutLabel {
        let n = self.prefix.len() - 1;
        debug_assert!(index < n, "snapshot index {index} outside series of {n}");

        let lo = (index + 1).min(n);
        let hi = (index + 1 + self.horizon).min(n);
        let future_sales = self.prefix[hi] - self.prefix[lo];

        StockoutLabel {
            future_sales,
            stockout: future_sales > inventory_qty,
            truncated: index + self.horizon > n - 1,
        }
    }
}
