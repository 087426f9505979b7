//! Cumulative rating statistics per calendar date.
//!
//! Running count and running mean of all ratings up to and including each
//! date. Days without new ratings carry the previous values forward; the
//! mean before the first rating is 0.0, never NaN. Ratings timestamped
//! before the calendar start are included in the opening totals.

use crate::calendar::Calendar;
use crate::tables::RatingEvent;

/// Cumulative rating stats, one slot per calendar date.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingSeries {
    pub count: Vec<i64>,
    pub mean: Vec<f64>,
}

impl RatingSeries {
    pub fn zeros(len: usize) -> Self {
        Self {
            count: vec![0; len],
            mean: vec![0.0; len],
        }
    }

    /// Merge-scan of timestamp-sorted ratings against the calendar.
    pub fn from_events(ratings: &[&RatingEvent], calendar: &Calendar) -> Self {
        let mut series = Self::zeros(calendar.len());
        if ratings.is_empty() {
            return series;
        }

        let mut sorted = ratings.to_vec();
        sorted.sort_by_key(|r| r.created_at);

        let mut cursor = 0;
        let mut count = 0i64;
        let mut sum = 0i64;

        for (i, &date) in calendar.dates().iter().enumerate() {
            while cursor < sorted.len() && sorted[cursor].created_at.date() <= date {
                count += 1;
                sum += sorted[cursor].rating;
                cursor += 1;
            }
            series.count[i] = count;
            series.mean[i] = if count > 0 {
                sum as f64 / count as f64
            } else {
                0.0
            };
        }

        series
    }
}
