//! Contiguous daily date axis with O(1) position lookup.
//!
//! Every per-entity series in the pipeline is aligned to one `Calendar`:
//! a gap-free, strictly increasing sequence of days from `start -
//! padding_days` through `end` inclusive. The lead-in padding exists so the
//! earliest snapshot date still has a full trailing window behind it;
//! feature rows are only emitted for the unpadded suffix `start..=end`.
//!
//! Dates are `NaiveDate` — a single daily granularity with no time-of-day
//! component, so equality and ordering are well defined.

use chrono::{Days, NaiveDate};

use crate::error::{FeatureError, Result};

/// The daily axis shared by all series of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Calendar {
    padded_start: NaiveDate,
    start: NaiveDate,
    end: NaiveDate,
    dates: Vec<NaiveDate>,
    padding_days: usize,
}

impl Calendar {
    /// Build the axis for `start..=end` with `padding_days` of lead-in.
    ///
    /// Fails with [`FeatureError::InvalidRange`] if `end < start`. Negative
    /// padding is unrepresentable by construction.
    pub fn new(start: NaiveDate, end: NaiveDate, padding_days: u32) -> Result<Self> {
        if end < start {
            return Err(FeatureError::InvalidRange { start, end });
        }

        let padded_start = start
            .checked_sub_days(Days::new(u64::from(padding_days)))
            .ok_or_else(|| {
                FeatureError::InvalidConfig(format!(
                    "padding of {padding_days} days underflows the calendar before {start}"
                ))
            })?;

        let total = end.signed_duration_since(padded_start).num_days() as usize + 1;
        let dates: Vec<NaiveDate> = padded_start.iter_days().take(total).collect();

        Ok(Self {
            padded_start,
            start,
            end,
            dates,
            padding_days: padding_days as usize,
        })
    }

    /// All dates, padding included.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Total number of days, padding included.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// First padded date.
    pub fn padded_start(&self) -> NaiveDate {
        self.padded_start
    }

    /// First snapshot date.
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last date (also the last date for which event data was loaded; label
    /// windows reaching past it are truncated).
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Index of `date` on the axis, or `None` when it falls outside.
    /// Constant time: the axis is gap-free, so position is day arithmetic.
    pub fn position(&self, date: NaiveDate) -> Option<usize> {
        let offset = date.signed_duration_since(self.padded_start).num_days();
        if offset < 0 || offset as usize >= self.dates.len() {
            None
        } else {
            Some(offset as usize)
        }
    }

    /// Index of the first snapshot date.
    pub fn first_snapshot_index(&self) -> usize {
        self.padding_days
    }

    /// Number of snapshot dates (rows emitted per entity, before any
    /// truncation filtering).
    pub fn snapshot_len(&self) -> usize {
        self.dates.len() - self.padding_days
    }

    /// Iterate `(axis_index, date)` over the snapshot suffix.
    pub fn snapshots(&self) -> impl Iterator<Item = (usize, NaiveDate)> + '_ {
        self.dates
            .iter()
            .enumerate()
            .skip(self.padding_days)
            .map(|(i, d)| (i, *d))
    }
}
