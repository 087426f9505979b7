//! Stockout Features
//!
//! Temporal feature and label computation engine for near-term stockout
//! prediction. Sparse, irregularly-timestamped retail events (page views,
//! purchases, cart-adds, revenue, inventory updates, ratings) become a
//! dense per-entity, per-day feature table with forward-looking stockout
//! labels, computed without lookahead bias and batch-parallel across the
//! entity list.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      stockout-features                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  calendar.rs    - contiguous daily axis, O(1) date lookup       │
//! │  tables.rs      - input tables, ingestion parsing, entity index │
//! │  timeseries.rs  - dense zero-filled daily series                │
//! │  rolling.rs     - O(N) trailing window sums                     │
//! │  inventory.rs   - point-in-time state (backward as-of join)     │
//! │  ratings.rs     - cumulative count / mean                       │
//! │  labeling.rs    - forward demand window, truncation policy      │
//! │  features.rs    - FeatureRow assembly                           │
//! │  pipeline.rs    - per-entity computation                        │
//! │  batch.rs       - rayon batch orchestration, run summary        │
//! │  validation.rs  - output-table quality checks                   │
//! │  export.rs      - CSV sink + dataset statistics                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Data flow: raw event/state tables → entity group-by index → calendar
//! alignment → {rolling windows, point-in-time inventory, cumulative
//! ratings} → row assembly → label generation → sorted output table.
//!
//! # Guarantees
//!
//! - A rolling window at date D never reads events after D; a label's
//!   forward window never reads events at or before D.
//! - Batches share no mutable state, and the output table is sorted by
//!   (product id, store id, snapshot date) — two runs over identical
//!   inputs produce byte-identical tables regardless of scheduling.
//! - Per-entity failures skip the entity; a failed batch drops only its
//!   own rows; only configuration errors abort a run.
//!
//! # Example
//!
//! ```ignore
//! use stockout_features::prelude::*;
//!
//! let config = PipelineConfig::default();
//! let processor = BatchProcessor::new(config, BatchConfig::new().with_threads(8));
//! let output = processor.run(&tables, start_date, end_date)?;
//! stockout_features::export::write_csv(&output.rows, "features.csv")?;
//! ```

pub mod batch;
pub mod calendar;
pub mod config;
pub mod error;
pub mod export;
pub mod features;
pub mod inventory;
pub mod labeling;
pub mod pipeline;
pub mod prelude;
pub mod ratings;
pub mod rolling;
pub mod tables;
pub mod timeseries;
pub mod validation;

pub use batch::{
    extract_features, BatchConfig, BatchFailure, BatchProcessor, CancellationToken, ErrorMode,
    LogProgress, ProgressCallback, ProgressInfo, RunOutput, RunSummary, SkippedEntity,
};
pub use calendar::Calendar;
pub use config::{LabelConfig, PipelineConfig, RunMetadata, WindowConfig};
pub use error::{FeatureError, Result};
pub use export::{write_csv, write_csv_to, DatasetStats};
pub use features::{FeatureRow, PriceStats, RESTOCK_SENTINEL_DAYS};
pub use inventory::InventorySeries;
pub use labeling::{LabelGenerator, StockoutLabel, TruncationPolicy};
pub use pipeline::{EntityOutput, EntityPipeline};
pub use ratings::RatingSeries;
pub use rolling::{trailing_sum, GroupWindows, RollingWindows};
pub use tables::{
    DailyEvent, EntityIndex, EntityRecord, GroupDailyEvent, InputTables, PriceFact, RatingEvent,
    RawDailyEvent, RawRatingEvent, RawStateUpdate, StateUpdate,
};
pub use timeseries::DailySeries;
pub use validation::{validate_entity_rows, ValidationLevel, ValidationResult};
