//! Per-entity feature pipeline.
//!
//! Connects the components for one entity at a time:
//!
//! ```text
//! DailyEvent rows ──► DailySeries ──► RollingWindows ─────────┐
//! GroupDailyEvent ──► DailySeries ──► GroupWindows ───────────┤
//! StateUpdate rows ─► InventorySeries (as-of join) ───────────┼──► FeatureRow
//! RatingEvent rows ─► RatingSeries (cumulative) ──────────────┤     per snapshot
//! PriceFact rows ───► PriceStats ─────────────────────────────┤
//! purchases series ─► LabelGenerator (forward window) ────────┘
//! ```
//!
//! Each call is a pure function of the entity's pre-grouped row slices and
//! the shared calendar; nothing is cached between entities, which is what
//! lets batches run entities in parallel without locks.
//!
//! An entity with zero daily events in range still produces a full set of
//! all-zero rows (missing data is a warning, not an error). Contract
//! violations (duplicate days) and failed output validation surface as
//! entity-scoped errors the batch layer recovers from.

use crate::calendar::Calendar;
use crate::config::PipelineConfig;
use crate::error::{FeatureError, Result};
use crate::features::{build_row, FeatureRow, PriceStats, RowInputs};
use crate::inventory::InventorySeries;
use crate::labeling::{LabelGenerator, TruncationPolicy};
use crate::ratings::RatingSeries;
use crate::rolling::{GroupWindows, RollingWindows};
use crate::tables::{EntityIndex, EntityRecord, StateUpdate};
use crate::timeseries::DailySeries;
use crate::validation::validate_entity_rows;

/// Rows and bookkeeping for one computed entity.
#[derive(Debug, Clone)]
pub struct EntityOutput {
    /// Date-ordered feature rows (already filtered if the truncation policy
    /// is `Exclude`).
    pub rows: Vec<FeatureRow>,
    /// False when the entity had no daily events in range.
    pub had_events: bool,
}

/// Computes feature rows for single entities against a shared calendar.
pub struct EntityPipeline<'a> {
    config: &'a PipelineConfig,
    calendar: &'a Calendar,
}

impl<'a> EntityPipeline<'a> {
    /// The config must already be validated by the orchestrator.
    pub fn new(config: &'a PipelineConfig, calendar: &'a Calendar) -> Self {
        Self { config, calendar }
    }

    /// Build all snapshot rows for `entity` from the run-level index.
    pub fn build_rows(&self, entity: &EntityRecord, index: &EntityIndex<'_>) -> Result<EntityOutput> {
        self.build_rows_inner(entity, index)
            .map_err(|e| e.for_entity(&entity.id, &entity.store_id))
    }

    fn build_rows_inner(
        &self,
        entity: &EntityRecord,
        index: &EntityIndex<'_>,
    ) -> Result<EntityOutput> {
        let calendar = self.calendar;

        let events = index.events_for(&entity.id);
        let had_events = !events.is_empty();
        if !had_events {
            log::warn!(
                "entity {}/{} has no daily events in range; emitting all-zero features",
                entity.id,
                entity.store_id
            );
        }

        let series = DailySeries::from_events(events, calendar)?;
        let windows = RollingWindows::compute(&series, &self.config.windows);

        let group_series =
            DailySeries::from_group_events(index.group_events_for(&entity.store_id), calendar)?;
        let group_windows = GroupWindows::compute(&group_series, &self.config.windows);

        let facts = index.price_facts_for(&entity.id);
        let price_stats = PriceStats::from_facts(facts);

        // The price facts double as the variant registry; de-duplicate in
        // case a variant carries several facts.
        let mut variant_ids: Vec<&str> = facts.iter().map(|f| f.variant_id.as_str()).collect();
        variant_ids.sort_unstable();
        variant_ids.dedup();
        let updates_by_variant: Vec<Vec<&StateUpdate>> = variant_ids
            .iter()
            .map(|variant| index.updates_for(variant).to_vec())
            .collect();
        let inventory = InventorySeries::reconstruct(&updates_by_variant, calendar);

        let ratings = RatingSeries::from_events(index.ratings_for(&entity.id), calendar);

        let labeler =
            LabelGenerator::new(&series.purchases, self.config.label.horizon_days as usize);
        let exclude_truncated = self.config.label.truncation == TruncationPolicy::Exclude;

        let mut rows = Vec::with_capacity(calendar.snapshot_len());
        for (i, snapshot_date) in calendar.snapshots() {
            let label = labeler.label_at(i, inventory.quantity[i]);
            if label.truncated && exclude_truncated {
                continue;
            }
            rows.push(build_row(RowInputs {
                entity,
                snapshot_date,
                index: i,
                windows: &windows,
                group_windows: &group_windows,
                price_stats,
                inventory: &inventory,
                ratings: &ratings,
                label,
                window_config: &self.config.windows,
            }));
        }

        let report = validate_entity_rows(&rows);
        if !report.is_valid() {
            return Err(FeatureError::InvalidRows(report.errors().join("; ")));
        }

        Ok(EntityOutput { rows, had_events })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::RESTOCK_SENTINEL_DAYS;
    use crate::tables::{DailyEvent, InputTables, PriceFact, RatingEvent};
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    fn tables_with_events(events: Vec<DailyEvent>) -> InputTables {
        InputTables::new()
            .with_entities(vec![EntityRecord::new("p1", "s1")])
            .with_daily_events(events)
    }

    #[test]
    fn test_zero_event_entity_emits_all_zero_rows() {
        let config = PipelineConfig::default().with_padding_days(29);
        let calendar = Calendar::new(d(1), d(10), 29).unwrap();
        let tables = tables_with_events(vec![]);
        let index = EntityIndex::build(&tables);

        let pipeline = EntityPipeline::new(&config, &calendar);
        let output = pipeline
            .build_rows(&tables.entities[0], &index)
            .unwrap();

        assert!(!output.had_events);
        assert_eq!(output.rows.len(), 10);
        for row in &output.rows {
            assert_eq!(row.sales_30d, 0);
            assert_eq!(row.views_7d, 0);
            assert_eq!(row.inventory_qty, 0);
            assert_eq!(row.future_sales, 0);
            assert_eq!(row.stockout, 0);
            assert_eq!(row.days_since_restock, RESTOCK_SENTINEL_DAYS);
        }
    }

    #[test]
    fn test_duplicate_day_is_entity_scoped_error() {
        let config = PipelineConfig::default();
        let calendar = Calendar::new(d(1), d(10), 29).unwrap();
        let event = DailyEvent {
            product_id: "p1".into(),
            date: d(4),
            views: 1,
            purchases: 1,
            add_to_carts: 0,
            revenue: 0.0,
        };
        let tables = tables_with_events(vec![event.clone(), event]);
        let index = EntityIndex::build(&tables);

        let pipeline = EntityPipeline::new(&config, &calendar);
        let err = pipeline
            .build_rows(&tables.entities[0], &index)
            .unwrap_err();
        assert!(err.is_entity_scoped());
        assert!(err.to_string().contains("p1/s1"));
    }

    #[test]
    fn test_rows_are_date_ordered_and_complete() {
        let config = PipelineConfig::default();
        let calendar = Calendar::new(d(1), d(20), 29).unwrap();
        let tables = tables_with_events(vec![DailyEvent {
            product_id: "p1".into(),
            date: d(5),
            views: 40,
            purchases: 8,
            add_to_carts: 12,
            revenue: 79.92,
        }])
        .with_price_facts(vec![PriceFact {
            variant_id: "v1".into(),
            product_id: "p1".into(),
            price: 9.99,
        }])
        .with_rating_events(vec![RatingEvent {
            product_id: "p1".into(),
            created_at: d(2).and_hms_opt(10, 0, 0).unwrap(),
            rating: 4,
        }]);
        let index = EntityIndex::build(&tables);

        let pipeline = EntityPipeline::new(&config, &calendar);
        let output = pipeline
            .build_rows(&tables.entities[0], &index)
            .unwrap();

        assert!(output.had_events);
        assert_eq!(output.rows.len(), 20);
        for pair in output.rows.windows(2) {
            assert!(pair[0].snapshot_date < pair[1].snapshot_date);
        }
        // The day-5 purchase shows up in the 7-day window on day 5.
        let day5 = &output.rows[4];
        assert_eq!(day5.sales_7d, 8);
        assert_eq!(day5.avg_price, 9.99);
        assert_eq!(day5.rating_count, 1);
        assert_eq!(day5.avg_rating, 4.0);
    }
}
