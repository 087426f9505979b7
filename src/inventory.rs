//! Point-in-time inventory reconstruction (backward as-of join).
//!
//! Inventory is a slowly-changing quantity observed through irregular
//! [`StateUpdate`] events per variant. For every calendar date the
//! reconstructed value is the quantity of the most recent update at or
//! before that date — an update takes effect on its own calendar date and
//! carries forward until superseded. Before a variant's first update its
//! contribution is 0. An entity's inventory is the sum over its variants.
//!
//! The scan is a two-pointer merge over (updates sorted by timestamp) ×
//! (calendar dates): O(updates + dates) per variant, not a per-date binary
//! search.
//!
//! Quantities are clipped at 0 to tolerate malformed sources. The scan also
//! records, per date, the latest update date at or before it across all
//! variants — the input for `days_since_restock`, computed point-in-time so
//! later updates never influence earlier snapshots.

use chrono::NaiveDate;

use crate::calendar::Calendar;
use crate::tables::StateUpdate;

/// Reconstructed inventory, one slot per calendar date.
#[derive(Debug, Clone, PartialEq)]
pub struct InventorySeries {
    /// Summed on-hand quantity per date.
    pub quantity: Vec<i64>,
    /// Latest update date at or before each date, across all variants.
    pub last_update: Vec<Option<NaiveDate>>,
}

impl InventorySeries {
    /// All-zero series (no variants or no updates).
    pub fn zeros(len: usize) -> Self {
        Self {
            quantity: vec![0; len],
            last_update: vec![None; len],
        }
    }

    /// Reconstruct from per-variant update slices. Each inner slice holds
    /// one variant's updates in any order; ties on timestamp resolve to the
    /// later input row (stable sort).
    pub fn reconstruct(updates_by_variant: &[Vec<&StateUpdate>], calendar: &Calendar) -> Self {
        let mut series = Self::zeros(calendar.len());

        for updates in updates_by_variant {
            if updates.is_empty() {
                continue;
            }
            let mut sorted = updates.clone();
            sorted.sort_by_key(|u| u.updated_at);

            let mut cursor = 0;
            let mut current = 0i64;
            let mut last_seen: Option<NaiveDate> = None;

            for (i, &date) in calendar.dates().iter().enumerate() {
                while cursor < sorted.len() && sorted[cursor].updated_at.date() <= date {
                    current = sorted[cursor].quantity.max(0);
                    last_seen = Some(sorted[cursor].updated_at.date());
                    cursor += 1;
                }
                series.quantity[i] += current;
                if let Some(seen) = last_seen {
                    if series.last_update[i].map_or(true, |existing| seen > existing) {
                        series.last_update[i] = Some(seen);
                    }
                }
            }
        }

        series
    }
}
