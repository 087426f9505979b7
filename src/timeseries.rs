//! Dense daily series aligned to the calendar.
//!
//! Sparse per-day event rows become one value per calendar date, zero-filled
//! where no data exists. Input rows are required to be pre-summed per day;
//! a duplicate date fails the entity rather than silently double-counting.

use crate::calendar::Calendar;
use crate::error::{FeatureError, Result};
use crate::tables::{DailyEvent, GroupDailyEvent};

/// One entity's daily activity, one slot per calendar date.
#[derive(Debug, Clone, PartialEq)]
pub struct DailySeries {
    pub views: Vec<i64>,
    pub purchases: Vec<i64>,
    pub add_to_carts: Vec<i64>,
    pub revenue: Vec<f64>,
}

impl DailySeries {
    /// All-zero series over `len` days.
    pub fn zeros(len: usize) -> Self {
        Self {
            views: vec![0; len],
            purchases: vec![0; len],
            add_to_carts: vec![0; len],
            revenue: vec![0.0; len],
        }
    }

    /// Align one product's events to the calendar. Events dated outside the
    /// calendar are ignored; a duplicate in-range date is an error.
    pub fn from_events(events: &[&DailyEvent], calendar: &Calendar) -> Result<Self> {
        Self::fill(
            calendar,
            events
                .iter()
                .map(|e| (e.date, e.views, e.purchases, e.add_to_carts, e.revenue)),
        )
    }

    /// Align one store's events to the calendar. Same contract as
    /// [`DailySeries::from_events`].
    pub fn from_group_events(events: &[&GroupDailyEvent], calendar: &Calendar) -> Result<Self> {
        Self::fill(
            calendar,
            events
                .iter()
                .map(|e| (e.date, e.views, e.purchases, e.add_to_carts, e.revenue)),
        )
    }

    fn fill(
        calendar: &Calendar,
        records: impl Iterator<Item = (chrono::NaiveDate, i64, i64, i64, f64)>,
    ) -> Result<Self> {
        let mut series = Self::zeros(calendar.len());
        let mut occupied = vec![false; calendar.len()];

        for (date, views, purchases, add_to_carts, revenue) in records {
            let Some(index) = calendar.position(date) else {
                continue;
            };
            if occupied[index] {
                return Err(FeatureError::DuplicateDailyEvent { date });
            }
            occupied[index] = true;
            series.views[index] = views;
            series.purchases[index] = purchases;
            series.add_to_carts[index] = add_to_carts;
            series.revenue[index] = revenue;
        }

        Ok(series)
    }

    pub fn len(&self) -> usize {
        self.purchases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.purchases.is_empty()
    }
}
