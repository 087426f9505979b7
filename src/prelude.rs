//! Convenience re-exports for typical usage.
//!
//! ```ignore
//! use stockout_features::prelude::*;
//!
//! let config = PipelineConfig::default();
//! let output = extract_features(&config, &tables, start, end)?;
//! ```

// ============================================================================
// Orchestration
// ============================================================================

pub use crate::batch::{
    extract_features, BatchConfig, BatchProcessor, CancellationToken, ErrorMode, RunOutput,
    RunSummary,
};

// ============================================================================
// Configuration
// ============================================================================

pub use crate::config::{LabelConfig, PipelineConfig, RunMetadata, WindowConfig};
pub use crate::labeling::TruncationPolicy;

// ============================================================================
// Data model
// ============================================================================

pub use crate::calendar::Calendar;
pub use crate::features::{FeatureRow, PriceStats};
pub use crate::tables::{
    DailyEvent, EntityRecord, GroupDailyEvent, InputTables, PriceFact, RatingEvent, StateUpdate,
};

// ============================================================================
// Errors
// ============================================================================

pub use crate::error::{FeatureError, Result};
