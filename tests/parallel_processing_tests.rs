//! Batch orchestration tests.
//!
//! These verify:
//! 1. The output table is invariant to batch size and thread count
//! 2. Per-entity failures are isolated and reported, never fatal
//! 3. Cancellation stops submission without emitting partial batches
//! 4. Configuration errors are fatal before any batch starts
//! 5. Run summary accounting adds up

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use stockout_features::prelude::*;
use stockout_features::{ProgressCallback, ProgressInfo};

// ============================================================================
// Fixtures
// ============================================================================

fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
}

fn daily(product: &str, date: NaiveDate, purchases: i64) -> DailyEvent {
    DailyEvent {
        product_id: product.into(),
        date,
        views: purchases * 4,
        purchases,
        add_to_carts: purchases,
        revenue: purchases as f64 * 7.5,
    }
}

fn fleet_tables(entity_count: usize) -> InputTables {
    let entities: Vec<EntityRecord> = (0..entity_count)
        .map(|i| EntityRecord::new(format!("p{i:04}"), format!("s{}", i % 5)))
        .collect();
    let events: Vec<DailyEvent> = (0..entity_count)
        .flat_map(|i| {
            let product = format!("p{i:04}");
            vec![
                daily(&product, d(1 + (i % 10) as u32), (i % 7) as i64 + 1),
                daily(&product, d(11 + (i % 5) as u32), (i % 3) as i64),
            ]
        })
        .collect();
    InputTables::new()
        .with_entities(entities)
        .with_daily_events(events)
}

// ============================================================================
// Scheduling invariance
// ============================================================================

#[test]
fn test_output_invariant_to_batch_size_and_threads() {
    let tables = fleet_tables(60);
    let config = PipelineConfig::default();

    let baseline = BatchProcessor::new(config.clone(), BatchConfig::new().with_batch_size(1))
        .run(&tables, d(1), d(15))
        .unwrap();

    for (batch_size, threads) in [(3, 1), (7, 4), (60, 2), (100, 8)] {
        let run = BatchProcessor::new(
            config.clone(),
            BatchConfig::new()
                .with_batch_size(batch_size)
                .with_threads(threads),
        )
        .run(&tables, d(1), d(15))
        .unwrap();

        assert_eq!(
            run.rows, baseline.rows,
            "batch_size={batch_size} threads={threads}"
        );
    }
}

#[test]
fn test_batch_partitioning_covers_every_entity() {
    // 1000 entities in batches of 100: exactly entities x snapshots rows.
    let tables = fleet_tables(1000);
    let run = BatchProcessor::new(
        PipelineConfig::default(),
        BatchConfig::new().with_batch_size(100).with_threads(4),
    )
    .run(&tables, d(1), d(10))
    .unwrap();

    assert_eq!(run.rows.len(), 1000 * 10);
    assert_eq!(run.summary.entities_total, 1000);
    assert_eq!(run.summary.entities_processed, 1000);
    assert_eq!(run.summary.batches_total, 10);
    assert!(run.summary.entities_skipped.is_empty());
    assert!(run.summary.all_successful());
}

// ============================================================================
// Failure isolation
// ============================================================================

#[test]
fn test_duplicate_event_entity_skipped_others_survive() {
    let mut tables = fleet_tables(10);
    // Violate the pre-summed contract for one entity.
    tables.daily_events.push(daily("p0003", d(2), 5));
    tables.daily_events.push(daily("p0003", d(2), 6));

    for error_mode in [ErrorMode::FailFast, ErrorMode::CollectErrors] {
        let run = BatchProcessor::new(
            PipelineConfig::default(),
            BatchConfig::new().with_batch_size(4).with_error_mode(error_mode),
        )
        .run(&tables, d(1), d(10))
        .unwrap();

        // Per-entity failures never abort the run, in either mode.
        assert_eq!(run.summary.entities_processed, 9);
        assert_eq!(run.summary.entities_skipped.len(), 1);
        assert_eq!(run.summary.entities_skipped[0].product_id, "p0003");
        assert!(run.summary.entities_skipped[0].reason.contains("duplicate"));
        assert_eq!(run.rows.len(), 9 * 10);
        assert!(!run.rows.iter().any(|r| r.product_id == "p0003"));
    }
}

// ============================================================================
// Cancellation
// ============================================================================

#[test]
fn test_pre_cancelled_run_emits_nothing() {
    let tables = fleet_tables(50);
    let token = CancellationToken::new();
    token.cancel();

    let run = BatchProcessor::new(
        PipelineConfig::default(),
        BatchConfig::new().with_batch_size(10),
    )
    .with_cancellation_token(token)
    .run(&tables, d(1), d(10))
    .unwrap();

    assert!(run.rows.is_empty());
    assert!(run.summary.was_cancelled);
    assert_eq!(run.summary.batches_skipped, 5);
    assert_eq!(run.summary.entities_processed, 0);
}

// ============================================================================
// Fatal configuration errors
// ============================================================================

#[test]
fn test_invalid_pipeline_config_is_fatal() {
    let tables = fleet_tables(5);
    let config = PipelineConfig::default().with_padding_days(3);

    let err = BatchProcessor::with_pipeline_config(config)
        .run(&tables, d(1), d(10))
        .unwrap_err();
    assert!(matches!(err, FeatureError::InvalidConfig(_)));
}

#[test]
fn test_invalid_batch_config_is_fatal() {
    let tables = fleet_tables(5);
    let err = BatchProcessor::new(
        PipelineConfig::default(),
        BatchConfig::new().with_batch_size(0),
    )
    .run(&tables, d(1), d(10))
    .unwrap_err();
    assert!(matches!(err, FeatureError::InvalidConfig(_)));
}

// ============================================================================
// Progress reporting
// ============================================================================

struct CountingCallback {
    progress_calls: AtomicUsize,
    complete_calls: AtomicUsize,
}

impl ProgressCallback for CountingCallback {
    fn on_progress(&self, _info: &ProgressInfo) {
        self.progress_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn on_complete(&self, _summary: &RunSummary) {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_progress_callback_sees_every_batch() {
    let tables = fleet_tables(40);
    let callback = Arc::new(CountingCallback {
        progress_calls: AtomicUsize::new(0),
        complete_calls: AtomicUsize::new(0),
    });

    struct Forward(Arc<CountingCallback>);
    impl ProgressCallback for Forward {
        fn on_progress(&self, info: &ProgressInfo) {
            self.0.on_progress(info);
        }
        fn on_complete(&self, summary: &RunSummary) {
            self.0.on_complete(summary);
        }
    }

    let run = BatchProcessor::new(
        PipelineConfig::default(),
        BatchConfig::new().with_batch_size(10).with_threads(2),
    )
    .with_progress_callback(Box::new(Forward(callback.clone())))
    .run(&tables, d(1), d(5))
    .unwrap();

    assert_eq!(run.summary.batches_total, 4);
    assert_eq!(callback.progress_calls.load(Ordering::SeqCst), 4);
    assert_eq!(callback.complete_calls.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Summary accounting
// ============================================================================

#[test]
fn test_summary_accounts_for_every_entity() {
    let mut tables = fleet_tables(25);
    tables
        .entities
        .push(EntityRecord::new("quiet-product", "s9"));
    tables.daily_events.push(daily("p0001", d(3), 2));
    tables.daily_events.push(daily("p0001", d(3), 2)); // duplicate

    let run = BatchProcessor::new(
        PipelineConfig::default(),
        BatchConfig::new().with_batch_size(8),
    )
    .run(&tables, d(1), d(10))
    .unwrap();

    let summary = &run.summary;
    assert_eq!(summary.entities_total, 26);
    assert_eq!(
        summary.entities_processed + summary.entities_skipped.len(),
        summary.entities_total
    );
    assert_eq!(summary.entities_without_events, 1);
    assert_eq!(summary.rows_emitted, run.rows.len());
    assert!(!summary.all_successful());
}
