//! Feature row assembly.
//!
//! Joins the per-entity series (rolling windows, point-in-time inventory,
//! cumulative ratings), static price stats, store-level windows, and
//! calendar features into one fully-populated [`FeatureRow`] per (entity,
//! snapshot date). The row is a fixed struct mirroring the documented
//! schema — there are no implicit missing fields, and defaults (0 counts,
//! 0.0 stats, the restock sentinel) are explicit.
//!
//! Ratio features guard their denominators: `sales_ratio_7_to_30` is 0.0
//! when the 30-day sum is 0, `view_to_purchase_7d` is 0.0 when the 7-day
//! view count is 0. No NaN or infinity ever reaches a row.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::config::WindowConfig;
use crate::inventory::InventorySeries;
use crate::labeling::StockoutLabel;
use crate::ratings::RatingSeries;
use crate::rolling::{GroupWindows, RollingWindows};
use crate::tables::{EntityRecord, PriceFact};

/// Days-since-restock value when no update exists at or before the
/// snapshot.
pub const RESTOCK_SENTINEL_DAYS: i64 = 365;

/// Static price statistics over an entity's variants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceStats {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
}

impl PriceStats {
    /// Aggregate over the entity's price facts; all-zero when it has no
    /// variants.
    pub fn from_facts(facts: &[&PriceFact]) -> Self {
        if facts.is_empty() {
            return Self {
                avg: 0.0,
                min: 0.0,
                max: 0.0,
            };
        }
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for fact in facts {
            sum += fact.price;
            min = min.min(fact.price);
            max = max.max(fact.price);
        }
        Self {
            avg: sum / facts.len() as f64,
            min,
            max,
        }
    }
}

/// One output record per (entity, snapshot date). Serializes with the
/// camelCase column names of the downstream training table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureRow {
    pub product_id: String,
    pub store_id: String,
    pub snapshot_date: NaiveDate,

    // Rolling sales aggregates.
    pub sales_7d: i64,
    pub sales_14d: i64,
    pub sales_30d: i64,
    pub sales_7d_per_day: f64,
    pub sales_30d_per_day: f64,
    pub sales_ratio_7_to_30: f64,

    // Rolling demand-signal aggregates.
    pub views_7d: i64,
    pub views_30d: i64,
    pub add_to_carts_7d: i64,
    pub view_to_purchase_7d: f64,

    // Static price stats.
    pub avg_price: f64,
    pub min_price: f64,
    pub max_price: f64,

    // Cumulative rating stats.
    pub avg_rating: f64,
    pub rating_count: i64,

    // Point-in-time inventory.
    pub inventory_qty: i64,
    pub days_since_restock: i64,

    // Store-level rolling aggregates.
    pub store_views_7d: i64,
    pub store_purchases_7d: i64,

    // Calendar features.
    pub day_of_week: u8,
    pub is_weekend: u8,

    // Label fields.
    pub future_sales: i64,
    pub stockout: u8,
    pub label_truncated: bool,
}

/// Everything the assembler needs for one snapshot.
pub struct RowInputs<'a> {
    pub entity: &'a EntityRecord,
    pub snapshot_date: NaiveDate,
    /// Position of `snapshot_date` on the calendar axis.
    pub index: usize,
    pub windows: &'a RollingWindows,
    pub group_windows: &'a GroupWindows,
    pub price_stats: PriceStats,
    pub inventory: &'a InventorySeries,
    pub ratings: &'a RatingSeries,
    pub label: StockoutLabel,
    pub window_config: &'a WindowConfig,
}

/// Assemble one feature row.
pub fn build_row(inputs: RowInputs<'_>) -> FeatureRow {
    let i = inputs.index;
    let windows = inputs.windows;

    let sales_7d = windows.sales_7d[i];
    let sales_30d = windows.sales_30d[i];
    let views_7d = windows.views_7d[i];

    let sales_ratio_7_to_30 = if sales_30d > 0 {
        sales_7d as f64 / sales_30d as f64
    } else {
        0.0
    };
    let view_to_purchase_7d = if views_7d > 0 {
        sales_7d as f64 / views_7d as f64
    } else {
        0.0
    };

    let days_since_restock = inputs.inventory.last_update[i]
        .map(|last| inputs.snapshot_date.signed_duration_since(last).num_days())
        .unwrap_or(RESTOCK_SENTINEL_DAYS);

    let day_of_week = inputs.snapshot_date.weekday().num_days_from_monday() as u8;

    FeatureRow {
        product_id: inputs.entity.id.clone(),
        store_id: inputs.entity.store_id.clone(),
        snapshot_date: inputs.snapshot_date,

        sales_7d,
        sales_14d: windows.sales_14d[i],
        sales_30d,
        sales_7d_per_day: sales_7d as f64 / f64::from(inputs.window_config.window_7d),
        sales_30d_per_day: sales_30d as f64 / f64::from(inputs.window_config.window_30d),
        sales_ratio_7_to_30,

        views_7d,
        views_30d: windows.views_30d[i],
        add_to_carts_7d: windows.add_to_carts_7d[i],
        view_to_purchase_7d,

        avg_price: inputs.price_stats.avg,
        min_price: inputs.price_stats.min,
        max_price: inputs.price_stats.max,

        avg_rating: inputs.ratings.mean[i],
        rating_count: inputs.ratings.count[i],

        inventory_qty: inputs.inventory.quantity[i],
        days_since_restock,

        store_views_7d: inputs.group_windows.views_7d[i],
        store_purchases_7d: inputs.group_windows.purchases_7d[i],

        day_of_week,
        is_weekend: u8::from(day_of_week >= 5),

        future_sales: inputs.label.future_sales,
        stockout: u8::from(inputs.label.stockout),
        label_truncated: inputs.label.truncated,
    }
}
