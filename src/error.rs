//! Error taxonomy for the feature pipeline.
//!
//! One crate-level error enum with explicit recovery boundaries:
//!
//! | Variant | Boundary |
//! |---------|----------|
//! | `InvalidRange`, `InvalidConfig` | fatal, rejected before any batch starts |
//! | `MalformedTimestamp`, `InvalidRating` | rejected at ingestion, before the core |
//! | `DuplicateDailyEvent`, `InvalidRows`, `EntityCompute` | recovered per entity (skip + log) |
//! | `BatchFailed` | recovered per batch (drop its rows, others continue) |
//! | `Io`, `Csv`, `TomlSer`, `TomlDe`, `Json` | propagated to the caller |
//!
//! Entities with zero events in range are a warning, never an error: they
//! still produce all-zero feature rows.

use chrono::NaiveDate;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FeatureError>;

/// All failure modes of the feature pipeline.
#[derive(Debug, Error)]
pub enum FeatureError {
    /// Calendar range where the end date precedes the start date.
    #[error("invalid date range: end {end} is before start {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    /// Invalid pipeline or batch parameters. Fatal before any batch starts.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A date or datetime string that could not be parsed at ingestion.
    #[error("malformed timestamp: {value:?}")]
    MalformedTimestamp { value: String },

    /// A rating outside the 1..=5 contract, rejected at ingestion.
    #[error("rating {rating} outside the valid range 1..=5")]
    InvalidRating { rating: i64 },

    /// Daily events must be pre-summed per (entity, date); a duplicate date
    /// violates that contract and fails the entity.
    #[error("duplicate daily event for {date}; rows must be pre-summed per day")]
    DuplicateDailyEvent { date: NaiveDate },

    /// Output rows for an entity failed validation.
    #[error("feature rows failed validation: {0}")]
    InvalidRows(String),

    /// Wrapper carrying the entity whose computation failed. The batch
    /// recovers from this by skipping the entity and recording it in the
    /// run summary.
    #[error("failed to compute features for entity {product_id}/{store_id}: {source}")]
    EntityCompute {
        product_id: String,
        store_id: String,
        #[source]
        source: Box<FeatureError>,
    },

    /// A whole batch was dropped (all-or-nothing). Other batches continue
    /// unless the error mode is fail-fast.
    #[error("batch {index} failed: {message}")]
    BatchFailed { index: usize, message: String },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("toml serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("toml parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FeatureError {
    /// Wrap an error with the entity it occurred for.
    pub fn for_entity(self, product_id: &str, store_id: &str) -> Self {
        FeatureError::EntityCompute {
            product_id: product_id.to_string(),
            store_id: store_id.to_string(),
            source: Box::new(self),
        }
    }

    /// True if this error is recoverable at the per-entity boundary.
    pub fn is_entity_scoped(&self) -> bool {
        matches!(
            self,
            FeatureError::DuplicateDailyEvent { .. }
                | FeatureError::InvalidRows(_)
                | FeatureError::EntityCompute { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_wrapper_message() {
        let inner = FeatureError::DuplicateDailyEvent {
            date: NaiveDate::from_ymd_opt(2025, 3, 7).unwrap(),
        };
        let wrapped = inner.for_entity("prod-1", "store-9");
        let msg = wrapped.to_string();
        assert!(msg.contains("prod-1/store-9"));
        assert!(msg.contains("2025-03-07"));
        assert!(wrapped.is_entity_scoped());
    }

    #[test]
    fn test_entity_scoped_classification() {
        assert!(FeatureError::InvalidRows("nan".into()).is_entity_scoped());
        assert!(!FeatureError::InvalidConfig("bad".into()).is_entity_scoped());
        assert!(!FeatureError::BatchFailed {
            index: 0,
            message: "panic".into()
        }
        .is_entity_scoped());
    }
}
