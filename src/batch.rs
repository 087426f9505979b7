//! Parallel batch orchestration over the entity list.
//!
//! The entity list is partitioned into fixed-size batches and each batch is
//! processed as a pure function of the shared read-only inputs, so batches
//! map onto Rayon's work-stealing pool without locks:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                       BatchProcessor                           │
//! │  InputTables ──► EntityIndex (built once, read-only)           │
//! │  ┌───────────────────────────────────────────────────────────┐ │
//! │  │                  Rayon thread pool                        │ │
//! │  │  batch #1        batch #2        batch #N                 │ │
//! │  │  ┌──────────┐   ┌──────────┐   ┌──────────┐               │ │
//! │  │  │ entities │   │ entities │   │ entities │  (each owns   │ │
//! │  │  │ 0..k     │   │ k..2k    │   │ ...      │   its slice)  │ │
//! │  │  └────┬─────┘   └────┬─────┘   └────┬─────┘               │ │
//! │  │       ▼              ▼              ▼                     │ │
//! │  │  BatchResult    BatchResult    BatchResult                │ │
//! │  └───────────────────────┬───────────────────────────────────┘ │
//! │                          ▼                                     │
//! │        concat ─► sort by (product, store, date) ─► RunOutput   │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Failure boundaries
//!
//! - A per-entity error is logged, recorded in the [`RunSummary`], and the
//!   batch continues with its remaining entities.
//! - A panic inside a batch drops that batch's entire row set
//!   (all-or-nothing); with [`ErrorMode::CollectErrors`] the other batches
//!   continue, with [`ErrorMode::FailFast`] the run aborts.
//! - Only configuration errors abort before any batch starts.
//!
//! # Ordering
//!
//! The merge is order-independent with respect to batch completion: rows
//! are concatenated in batch order and then sorted by (product id, store
//! id, snapshot date), so the final table does not depend on scheduling.
//!
//! # Memory
//!
//! The per-batch footprint scales with `batch_size × calendar length`;
//! `batch_size` is the knob that bounds it.
//!
//! # Cancellation
//!
//! A [`CancellationToken`] is checked before each batch starts. Cancelled
//! batches emit nothing; completed batches are kept.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use rayon::prelude::*;

use crate::calendar::Calendar;
use crate::config::PipelineConfig;
use crate::error::{FeatureError, Result};
use crate::features::FeatureRow;
use crate::pipeline::EntityPipeline;
use crate::tables::{EntityIndex, EntityRecord, InputTables};

// ============================================================================
// Configuration
// ============================================================================

/// How batch-level failures are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Abort the run on the first failed batch (default).
    #[default]
    FailFast,

    /// Drop failed batches, keep going, report them in the summary.
    CollectErrors,
}

/// Batch orchestration knobs. Not serialized with the pipeline config.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Entities per batch. Bounds per-batch memory.
    pub batch_size: usize,

    /// Worker threads. `None` uses the Rayon default.
    pub num_threads: Option<usize>,

    /// Batch failure handling.
    pub error_mode: ErrorMode,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            num_threads: None,
            error_mode: ErrorMode::FailFast,
        }
    }
}

impl BatchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.num_threads = Some(threads);
        self
    }

    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(FeatureError::InvalidConfig(
                "batch_size must be > 0".to_string(),
            ));
        }
        if self.num_threads == Some(0) {
            return Err(FeatureError::InvalidConfig(
                "num_threads must be > 0 when set".to_string(),
            ));
        }
        Ok(())
    }

    /// Configured threads or Rayon's default.
    pub fn effective_threads(&self) -> usize {
        self.num_threads.unwrap_or_else(rayon::current_num_threads)
    }
}

// ============================================================================
// Cancellation
// ============================================================================

/// Thread-safe cancellation flag, cloneable across threads. Cancelling
/// stops submission of further batches; in-flight batches finish normally.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Progress reporting
// ============================================================================

/// Snapshot of run progress handed to callbacks.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    pub batch_index: usize,
    pub total_batches: usize,
    pub completed: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

impl ProgressInfo {
    pub fn percent_complete(&self) -> f64 {
        if self.total_batches == 0 {
            100.0
        } else {
            (self.completed + self.failed) as f64 / self.total_batches as f64 * 100.0
        }
    }
}

/// Implement to observe batch starts and run completion.
pub trait ProgressCallback: Send + Sync {
    fn on_progress(&self, info: &ProgressInfo);
    fn on_complete(&self, summary: &RunSummary);
}

/// Progress reporter that writes through the `log` facade.
#[derive(Debug, Default)]
pub struct LogProgress;

impl ProgressCallback for LogProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        log::info!(
            "batch {}/{} starting ({:.1}% complete)",
            info.batch_index + 1,
            info.total_batches,
            info.percent_complete()
        );
    }

    fn on_complete(&self, summary: &RunSummary) {
        log::info!(
            "run complete: {} rows from {} entities in {:?} on {} threads ({} skipped, {} batch failures)",
            summary.rows_emitted,
            summary.entities_processed,
            summary.elapsed,
            summary.threads_used,
            summary.entities_skipped.len(),
            summary.batch_failures.len()
        );
    }
}

// ============================================================================
// Run results
// ============================================================================

/// An entity dropped by per-entity failure recovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntity {
    pub product_id: String,
    pub store_id: String,
    pub reason: String,
}

/// A batch dropped wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub batch_index: usize,
    pub entities: usize,
    pub message: String,
}

/// Accounting for one run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub entities_total: usize,
    pub entities_processed: usize,
    /// Entities skipped by per-entity failure recovery, sorted by key.
    pub entities_skipped: Vec<SkippedEntity>,
    /// Entities that had zero daily events in range (all-zero rows emitted).
    pub entities_without_events: usize,
    pub rows_emitted: usize,
    pub batches_total: usize,
    pub batch_failures: Vec<BatchFailure>,
    /// Batches never started because the run was cancelled.
    pub batches_skipped: usize,
    pub threads_used: usize,
    pub elapsed: Duration,
    pub was_cancelled: bool,
}

impl RunSummary {
    pub fn all_successful(&self) -> bool {
        self.entities_skipped.is_empty() && self.batch_failures.is_empty() && !self.was_cancelled
    }
}

/// Sorted feature table plus its run accounting.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub rows: Vec<FeatureRow>,
    pub summary: RunSummary,
}

// ============================================================================
// Batch processor
// ============================================================================

/// Orchestrates a full run: validate config, build the calendar and the
/// entity index, fan batches out over a local thread pool, merge
/// deterministically.
///
/// Built once at startup and passed by reference wherever it is needed;
/// there is no module-level state.
pub struct BatchProcessor {
    config: PipelineConfig,
    batch_config: BatchConfig,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
    cancellation_token: CancellationToken,
}

impl BatchProcessor {
    pub fn new(config: PipelineConfig, batch_config: BatchConfig) -> Self {
        Self {
            config,
            batch_config,
            progress_callback: None,
            cancellation_token: CancellationToken::new(),
        }
    }

    pub fn with_pipeline_config(config: PipelineConfig) -> Self {
        Self::new(config, BatchConfig::default())
    }

    pub fn with_progress_callback(mut self, callback: Box<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(Arc::from(callback));
        self
    }

    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    /// Clone of the token for cancelling from another thread.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    pub fn cancel(&self) {
        self.cancellation_token.cancel();
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn batch_config(&self) -> &BatchConfig {
        &self.batch_config
    }

    /// Run the full pipeline for snapshot dates `start..=end`.
    ///
    /// All inputs are pre-loaded; no I/O happens inside compute.
    pub fn run(&self, tables: &InputTables, start: NaiveDate, end: NaiveDate) -> Result<RunOutput> {
        self.config.validate()?;
        self.batch_config.validate()?;

        let run_start = Instant::now();
        let calendar = Calendar::new(start, end, self.config.padding_days)?;

        log::info!(
            "starting run over {} entities, {} snapshot dates ({} padded days), {} daily events, {} state updates, {} ratings, {} price facts",
            tables.entities.len(),
            calendar.snapshot_len(),
            calendar.len(),
            tables.daily_events.len(),
            tables.state_updates.len(),
            tables.rating_events.len(),
            tables.price_facts.len()
        );

        let index = EntityIndex::build(tables);
        let threads_used = self.batch_config.effective_threads();
        let batch_size = self.batch_config.batch_size;
        let total_batches = tables.entities.len().div_ceil(batch_size);

        let completed = AtomicUsize::new(0);
        let failed = AtomicUsize::new(0);

        enum BatchOutcome {
            Done(BatchResult),
            Failed { entities: usize, message: String },
            Skipped,
        }

        // A local pool so concurrent processors can use different thread
        // counts; build_global only works once per process.
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads_used)
            .build()
            .map_err(|e| {
                FeatureError::InvalidConfig(format!("failed to build thread pool: {e}"))
            })?;

        let outcomes: Vec<(usize, BatchOutcome)> = pool.install(|| {
            tables
                .entities
                .par_chunks(batch_size)
                .enumerate()
                .map(|(batch_index, batch_entities)| {
                    if self.cancellation_token.is_cancelled() {
                        return (batch_index, BatchOutcome::Skipped);
                    }

                    if let Some(ref callback) = self.progress_callback {
                        callback.on_progress(&ProgressInfo {
                            batch_index,
                            total_batches,
                            completed: completed.load(Ordering::Relaxed),
                            failed: failed.load(Ordering::Relaxed),
                            elapsed: run_start.elapsed(),
                        });
                    }

                    let run = catch_unwind(AssertUnwindSafe(|| {
                        process_batch(&self.config, &calendar, batch_entities, &index)
                    }));

                    match run {
                        Ok(result) => {
                            completed.fetch_add(1, Ordering::Relaxed);
                            (batch_index, BatchOutcome::Done(result))
                        }
                        Err(payload) => {
                            failed.fetch_add(1, Ordering::Relaxed);
                            let message = panic_message(payload.as_ref());
                            log::error!("batch {batch_index} dropped: {message}");
                            (
                                batch_index,
                                BatchOutcome::Failed {
                                    entities: batch_entities.len(),
                                    message,
                                },
                            )
                        }
                    }
                })
                .collect()
        });

        let mut rows: Vec<FeatureRow> = Vec::new();
        let mut entities_processed = 0;
        let mut entities_skipped: Vec<SkippedEntity> = Vec::new();
        let mut entities_without_events = 0;
        let mut batch_failures: Vec<BatchFailure> = Vec::new();
        let mut batches_skipped = 0;

        for (batch_index, outcome) in outcomes {
            match outcome {
                BatchOutcome::Done(result) => {
                    rows.extend(result.rows);
                    entities_processed += result.processed;
                    entities_skipped.extend(result.skipped);
                    entities_without_events += result.without_events;
                }
                BatchOutcome::Failed { entities, message } => {
                    if self.batch_config.error_mode == ErrorMode::FailFast {
                        return Err(FeatureError::BatchFailed {
                            index: batch_index,
                            message,
                        });
                    }
                    batch_failures.push(BatchFailure {
                        batch_index,
                        entities,
                        message,
                    });
                }
                BatchOutcome::Skipped => batches_skipped += 1,
            }
        }

        // Deterministic final order regardless of scheduling.
        rows.sort_by(|a, b| {
            (a.product_id.as_str(), a.store_id.as_str(), a.snapshot_date).cmp(&(
                b.product_id.as_str(),
                b.store_id.as_str(),
                b.snapshot_date,
            ))
        });
        entities_skipped.sort_by(|a, b| {
            (a.product_id.as_str(), a.store_id.as_str())
                .cmp(&(b.product_id.as_str(), b.store_id.as_str()))
        });

        let summary = RunSummary {
            entities_total: tables.entities.len(),
            entities_processed,
            entities_skipped,
            entities_without_events,
            rows_emitted: rows.len(),
            batches_total: total_batches,
            batch_failures,
            batches_skipped,
            threads_used,
            elapsed: run_start.elapsed(),
            was_cancelled: self.cancellation_token.is_cancelled(),
        };

        if let Some(ref callback) = self.progress_callback {
            callback.on_complete(&summary);
        }

        Ok(RunOutput { rows, summary })
    }
}

// ============================================================================
// Batch internals
// ============================================================================

struct BatchResult {
    rows: Vec<FeatureRow>,
    processed: usize,
    skipped: Vec<SkippedEntity>,
    without_events: usize,
}

/// Pure function of the batch's entity slice and the shared read-only
/// inputs. Per-entity failures are recovered here.
fn process_batch(
    config: &PipelineConfig,
    calendar: &Calendar,
    entities: &[EntityRecord],
    index: &EntityIndex<'_>,
) -> BatchResult {
    let pipeline = EntityPipeline::new(config, calendar);
    let mut result = BatchResult {
        rows: Vec::new(),
        processed: 0,
        skipped: Vec::new(),
        without_events: 0,
    };

    for entity in entities {
        match pipeline.build_rows(entity, index) {
            Ok(output) => {
                result.processed += 1;
                if !output.had_events {
                    result.without_events += 1;
                }
                result.rows.extend(output.rows);
            }
            Err(e) => {
                log::error!("skipping entity {}/{}: {e}", entity.id, entity.store_id);
                result.skipped.push(SkippedEntity {
                    product_id: entity.id.clone(),
                    store_id: entity.store_id.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    result
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ============================================================================
// Convenience functions
// ============================================================================

/// One-call run with default batch configuration.
pub fn extract_features(
    config: &PipelineConfig,
    tables: &InputTables,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<RunOutput> {
    BatchProcessor::with_pipeline_config(config.clone()).run(tables, start, end)
}
