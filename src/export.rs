//! Tabular sink for the feature table.
//!
//! Writes the sorted rows as CSV with the camelCase column names the
//! downstream training jobs expect, and logs dataset statistics the same
//! shape the export run always reported (row count, entity count, date
//! range, stockout rate).

use std::fs::File;
use std::io::Write;
use std::path::Path;

use ahash::AHashSet;
use chrono::NaiveDate;

use crate::error::Result;
use crate::features::FeatureRow;

/// Write rows as CSV to any sink. Column order and naming come from the
/// `FeatureRow` serialization.
pub fn write_csv_to<W: Write>(rows: &[FeatureRow], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write rows as CSV to a file and log the dataset statistics.
pub fn write_csv<P: AsRef<Path>>(rows: &[FeatureRow], path: P) -> Result<()> {
    let path = path.as_ref();
    write_csv_to(rows, File::create(path)?)?;
    let stats = DatasetStats::from_rows(rows);
    log::info!("exported {} feature rows to {}", rows.len(), path.display());
    stats.log();
    Ok(())
}

/// Summary statistics over an exported table.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetStats {
    pub rows: usize,
    pub entities: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub stockout_rows: usize,
    pub truncated_rows: usize,
}

impl DatasetStats {
    pub fn from_rows(rows: &[FeatureRow]) -> Self {
        let mut entities: AHashSet<(&str, &str)> = AHashSet::new();
        let mut first_date = None;
        let mut last_date = None;
        let mut stockout_rows = 0;
        let mut truncated_rows = 0;

        for row in rows {
            entities.insert((row.product_id.as_str(), row.store_id.as_str()));
            if first_date.map_or(true, |d| row.snapshot_date < d) {
                first_date = Some(row.snapshot_date);
            }
            if last_date.map_or(true, |d| row.snapshot_date > d) {
                last_date = Some(row.snapshot_date);
            }
            if row.stockout == 1 {
                stockout_rows += 1;
            }
            if row.label_truncated {
                truncated_rows += 1;
            }
        }

        Self {
            rows: rows.len(),
            entities: entities.len(),
            first_date,
            last_date,
            stockout_rows,
            truncated_rows,
        }
    }

    /// Fraction of rows labelled stockout.
    pub fn stockout_rate(&self) -> f64 {
        if self.rows == 0 {
            0.0
        } else {
            self.stockout_rows as f64 / self.rows as f64
        }
    }

    pub fn log(&self) {
        log::info!("dataset statistics:");
        log::info!("  total rows:      {}", self.rows);
        log::info!("  unique entities: {}", self.entities);
        if let (Some(first), Some(last)) = (self.first_date, self.last_date) {
            log::info!("  date range:      {first} to {last}");
        }
        log::info!(
            "  stockout rate:   {:.2}% ({} rows)",
            self.stockout_rate() * 100.0,
            self.stockout_rows
        );
        if self.truncated_rows > 0 {
            log::info!("  truncated labels: {}", self.truncated_rows);
        }
    }
}
