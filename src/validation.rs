//! Output-table validation.
//!
//! Quality checks run over one entity's date-ordered feature rows before
//! they leave the pipeline, so a malformed row never propagates into a
//! training table. Checks cover:
//!
//! 1. **Finiteness**: no NaN/infinity in any float column
//! 2. **Sign**: counts, inventory, and forward sums are non-negative
//! 3. **Calendar consistency**: day-of-week range and weekend flag
//! 4. **Label consistency**: the stockout flag matches its inputs
//! 5. **Monotonicity**: cumulative rating count never decreases over time
//!
//! A check failure is an error (the entity is skipped and reported);
//! truncated label windows are surfaced as a warning.

use std::fmt;

use crate::features::FeatureRow;

/// Severity of a single finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationLevel {
    Warning(String),
    Error(String),
}

impl ValidationLevel {
    pub fn is_error(&self) -> bool {
        matches!(self, ValidationLevel::Error(_))
    }
}

impl fmt::Display for ValidationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationLevel::Warning(msg) => write!(f, "warning: {msg}"),
            ValidationLevel::Error(msg) => write!(f, "error: {msg}"),
        }
    }
}

/// Aggregated findings for one entity's rows.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    findings: Vec<(String, ValidationLevel)>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, check: &str, message: String) {
        self.findings
            .push((check.to_string(), ValidationLevel::Error(message)));
    }

    pub fn add_warning(&mut self, check: &str, message: String) {
        self.findings
            .push((check.to_string(), ValidationLevel::Warning(message)));
    }

    /// No errors (warnings allowed).
    pub fn is_valid(&self) -> bool {
        !self.findings.iter().any(|(_, level)| level.is_error())
    }

    pub fn has_warnings(&self) -> bool {
        self.findings
            .iter()
            .any(|(_, level)| matches!(level, ValidationLevel::Warning(_)))
    }

    pub fn errors(&self) -> Vec<String> {
        self.findings
            .iter()
            .filter_map(|(check, level)| match level {
                ValidationLevel::Error(msg) => Some(format!("{check}: {msg}")),
                _ => None,
            })
            .collect()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.findings
            .iter()
            .filter_map(|(check, level)| match level {
                ValidationLevel::Warning(msg) => Some(format!("{check}: {msg}")),
                _ => None,
            })
            .collect()
    }
}

/// Validate one entity's rows, which must be in snapshot-date order.
pub fn validate_entity_rows(rows: &[FeatureRow]) -> ValidationResult {
    let mut result = ValidationResult::new();
    let mut truncated = 0usize;

    for row in rows {
        let date = row.snapshot_date;

        let floats = [
            ("sales7dPerDay", row.sales_7d_per_day),
            ("sales30dPerDay", row.sales_30d_per_day),
            ("salesRatio7To30", row.sales_ratio_7_to_30),
            ("viewToPurchase7d", row.view_to_purchase_7d),
            ("avgPrice", row.avg_price),
            ("minPrice", row.min_price),
            ("maxPrice", row.max_price),
            ("avgRating", row.avg_rating),
        ];
        for (name, value) in floats {
            if !value.is_finite() {
                result.add_error("finite", format!("{name} is {value} at {date}"));
            }
        }

        let counts = [
            ("sales7d", row.sales_7d),
            ("sales14d", row.sales_14d),
            ("sales30d", row.sales_30d),
            ("views7d", row.views_7d),
            ("views30d", row.views_30d),
            ("addToCarts7d", row.add_to_carts_7d),
            ("ratingCount", row.rating_count),
            ("inventoryQty", row.inventory_qty),
            ("futureSales", row.future_sales),
            ("daysSinceRestock", row.days_since_restock),
            ("storeViews7d", row.store_views_7d),
            ("storePurchases7d", row.store_purchases_7d),
        ];
        for (name, value) in counts {
            if value < 0 {
                result.add_error("sign", format!("{name} is {value} at {date}"));
            }
        }

        if row.day_of_week > 6 {
            result.add_error(
                "calendar",
                format!("dayOfWeek {} at {date}", row.day_of_week),
            );
        }
        if row.is_weekend != u8::from(row.day_of_week >= 5) {
            result.add_error(
                "calendar",
                format!("isWeekend inconsistent with dayOfWeek at {date}"),
            );
        }

        if row.stockout != u8::from(row.future_sales > row.inventory_qty) {
            result.add_error(
                "label",
                format!(
                    "stockout={} but futureSales={} inventoryQty={} at {date}",
                    row.stockout, row.future_sales, row.inventory_qty
                ),
            );
        }

        if row.min_price > row.max_price {
            result.add_error(
                "price",
                format!(
                    "minPrice {} > maxPrice {} at {date}",
                    row.min_price, row.max_price
                ),
            );
        }

        if row.label_truncated {
            truncated += 1;
        }
    }

    for pair in rows.windows(2) {
        if pair[1].rating_count < pair[0].rating_count {
            result.add_error(
                "monotonic",
                format!(
                    "ratingCount fell from {} to {} at {}",
                    pair[0].rating_count, pair[1].rating_count, pair[1].snapshot_date
                ),
            );
        }
    }

    if truncated > 0 {
        result.add_warning(
            "label",
            format!("{truncated} of {} rows have truncated label windows", rows.len()),
        );
    }

    result
}
