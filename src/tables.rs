//! Input data model, ingestion parsing, and the entity group-by index.
//!
//! The pipeline consumes five pre-loaded tables from the data-loading
//! collaborator (plus the optional store-level daily table):
//!
//! | Table | Keyed by | Feeds |
//! |-------|----------|-------|
//! | [`EntityRecord`] | product id | the entity list driving the run |
//! | [`DailyEvent`] | product id, date | rolling windows, labels |
//! | [`GroupDailyEvent`] | store id, date | store-level rolling sums |
//! | [`StateUpdate`] | variant id, timestamp | point-in-time inventory |
//! | [`RatingEvent`] | product id, timestamp | cumulative rating stats |
//! | [`PriceFact`] | variant id | price stats; doubles as the variant registry |
//!
//! Raw rows arrive with string timestamps; the `Raw*` mirror types convert
//! into the typed rows via `TryFrom`, rejecting unparseable dates with
//! [`FeatureError::MalformedTimestamp`] before anything reaches the core.
//!
//! [`EntityIndex`] is the group-by index built once per run: one hash-map
//! pass per table, after which every per-entity lookup is O(1) instead of a
//! rescan of the full table.

use ahash::AHashMap;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{FeatureError, Result};

// ============================================================================
// Typed rows
// ============================================================================

/// A product together with the store it belongs to. The `(id, store_id)`
/// pair is the entity key for every output row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: String,
    pub store_id: String,
}

impl EntityRecord {
    pub fn new(id: impl Into<String>, store_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            store_id: store_id.into(),
        }
    }
}

/// One pre-summed day of product activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyEvent {
    pub product_id: String,
    pub date: NaiveDate,
    pub views: i64,
    pub purchases: i64,
    pub add_to_carts: i64,
    pub revenue: f64,
}

/// One pre-summed day of store-level activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupDailyEvent {
    pub store_id: String,
    pub date: NaiveDate,
    pub views: i64,
    pub purchases: i64,
    pub add_to_carts: i64,
    pub revenue: f64,
}

/// An inventory level observed for a variant at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateUpdate {
    pub variant_id: String,
    pub updated_at: NaiveDateTime,
    pub quantity: i64,
}

/// A single product rating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingEvent {
    pub product_id: String,
    pub created_at: NaiveDateTime,
    pub rating: i64,
}

/// Static price of a variant. The set of a product's price facts is also
/// the set of its variants, which scopes inventory reconstruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceFact {
    pub variant_id: String,
    pub product_id: String,
    pub price: f64,
}

// ============================================================================
// Ingestion parsing
// ============================================================================

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Parse a `YYYY-MM-DD` date string.
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| FeatureError::MalformedTimestamp {
        value: value.to_string(),
    })
}

/// Parse a datetime string; a bare date is taken as midnight.
pub fn parse_datetime(value: &str) -> Result<NaiveDateTime> {
    for format in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(ts);
        }
    }
    parse_date(value).map(|d| d.and_time(chrono::NaiveTime::MIN))
}

/// Unvalidated daily event row as loaded from an external source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDailyEvent {
    pub product_id: String,
    pub date: String,
    pub views: i64,
    pub purchases: i64,
    pub add_to_carts: i64,
    pub revenue: f64,
}

impl TryFrom<RawDailyEvent> for DailyEvent {
    type Error = FeatureError;

    fn try_from(raw: RawDailyEvent) -> Result<Self> {
        Ok(DailyEvent {
            date: parse_date(&raw.date)?,
            product_id: raw.product_id,
            views: raw.views,
            purchases: raw.purchases,
            add_to_carts: raw.add_to_carts,
            revenue: raw.revenue,
        })
    }
}

/// Unvalidated inventory update row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawStateUpdate {
    pub variant_id: String,
    pub updated_at: String,
    pub quantity: i64,
}

impl TryFrom<RawStateUpdate> for StateUpdate {
    type Error = FeatureError;

    fn try_from(raw: RawStateUpdate) -> Result<Self> {
        Ok(StateUpdate {
            updated_at: parse_datetime(&raw.updated_at)?,
            variant_id: raw.variant_id,
            quantity: raw.quantity,
        })
    }
}

/// Unvalidated rating row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRatingEvent {
    pub product_id: String,
    pub created_at: String,
    pub rating: i64,
}

impl TryFrom<RawRatingEvent> for RatingEvent {
    type Error = FeatureError;

    fn try_from(raw: RawRatingEvent) -> Result<Self> {
        if !(1..=5).contains(&raw.rating) {
            return Err(FeatureError::InvalidRating { rating: raw.rating });
        }
        Ok(RatingEvent {
            created_at: parse_datetime(&raw.created_at)?,
            product_id: raw.product_id,
            rating: raw.rating,
        })
    }
}

// ============================================================================
// Input tables
// ============================================================================

/// Everything a run consumes, pre-loaded upfront by the data-loading
/// collaborator. No I/O happens after compute begins.
#[derive(Debug, Clone, Default)]
pub struct InputTables {
    pub entities: Vec<EntityRecord>,
    pub daily_events: Vec<DailyEvent>,
    pub group_daily_events: Vec<GroupDailyEvent>,
    pub state_updates: Vec<StateUpdate>,
    pub rating_events: Vec<RatingEvent>,
    pub price_facts: Vec<PriceFact>,
}

impl InputTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entities(mut self, entities: Vec<EntityRecord>) -> Self {
        self.entities = entities;
        self
    }

    pub fn with_daily_events(mut self, events: Vec<DailyEvent>) -> Self {
        self.daily_events = events;
        self
    }

    pub fn with_group_daily_events(mut self, events: Vec<GroupDailyEvent>) -> Self {
        self.group_daily_events = events;
        self
    }

    pub fn with_state_updates(mut self, updates: Vec<StateUpdate>) -> Self {
        self.state_updates = updates;
        self
    }

    pub fn with_rating_events(mut self, ratings: Vec<RatingEvent>) -> Self {
        self.rating_events = ratings;
        self
    }

    pub fn with_price_facts(mut self, facts: Vec<PriceFact>) -> Self {
        self.price_facts = facts;
        self
    }
}

// ============================================================================
// Group-by index
// ============================================================================

/// Entity group-by index over [`InputTables`].
///
/// Built once per run; shared read-only across batches. Rows keep their
/// input order within each bucket — downstream consumers sort by timestamp
/// where order matters.
#[derive(Debug)]
pub struct EntityIndex<'a> {
    events: AHashMap<&'a str, Vec<&'a DailyEvent>>,
    group_events: AHashMap<&'a str, Vec<&'a GroupDailyEvent>>,
    updates: AHashMap<&'a str, Vec<&'a StateUpdate>>,
    ratings: AHashMap<&'a str, Vec<&'a RatingEvent>>,
    price_facts: AHashMap<&'a str, Vec<&'a PriceFact>>,
}

impl<'a> EntityIndex<'a> {
    /// One pass per table.
    pub fn build(tables: &'a InputTables) -> Self {
        let mut events: AHashMap<&str, Vec<&DailyEvent>> = AHashMap::new();
        for row in &tables.daily_events {
            events.entry(row.product_id.as_str()).or_default().push(row);
        }

        let mut group_events: AHashMap<&str, Vec<&GroupDailyEvent>> = AHashMap::new();
        for row in &tables.group_daily_events {
            group_events
                .entry(row.store_id.as_str())
                .or_default()
                .push(row);
        }

        let mut updates: AHashMap<&str, Vec<&StateUpdate>> = AHashMap::new();
        for row in &tables.state_updates {
            updates
                .entry(row.variant_id.as_str())
                .or_default()
                .push(row);
        }

        let mut ratings: AHashMap<&str, Vec<&RatingEvent>> = AHashMap::new();
        for row in &tables.rating_events {
            ratings
                .entry(row.product_id.as_str())
                .or_default()
                .push(row);
        }

        let mut price_facts: AHashMap<&str, Vec<&PriceFact>> = AHashMap::new();
        for row in &tables.price_facts {
            price_facts
                .entry(row.product_id.as_str())
                .or_default()
                .push(row);
        }

        Self {
            events,
            group_events,
            updates,
            ratings,
            price_facts,
        }
    }

    pub fn events_for(&self, product_id: &str) -> &[&'a DailyEvent] {
        self.events.get(product_id).map_or(&[], Vec::as_slice)
    }

    pub fn group_events_for(&self, store_id: &str) -> &[&'a GroupDailyEvent] {
        self.group_events.get(store_id).map_or(&[], Vec::as_slice)
    }

    pub fn updates_for(&self, variant_id: &str) -> &[&'a StateUpdate] {
        self.updates.get(variant_id).map_or(&[], Vec::as_slice)
    }

    pub fn ratings_for(&self, product_id: &str) -> &[&'a RatingEvent] {
        self.ratings.get(product_id).map_or(&[], Vec::as_slice)
    }

    pub fn price_facts_for(&self, product_id: &str) -> &[&'a PriceFact] {
        self.price_facts.get(product_id).map_or(&[], Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_ok() {
        assert_eq!(
            parse_date("2025-03-07").unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 7).unwrap()
        );
    }

    #[test]
    fn test_parse_date_malformed() {
        for bad in ["07/03/2025", "2025-13-01", "not a date", ""] {
            let err = parse_date(bad).unwrap_err();
            assert!(matches!(err, FeatureError::MalformedTimestamp { .. }), "{bad}");
        }
    }

    #[test]
    fn test_parse_datetime_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 7)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        assert_eq!(parse_datetime("2025-03-07 14:30:00").unwrap(), expected);
        assert_eq!(parse_datetime("2025-03-07T14:30:00").unwrap(), expected);

        let midnight = parse_datetime("2025-03-07").unwrap();
        assert_eq!(midnight.date(), NaiveDate::from_ymd_opt(2025, 3, 7).unwrap());
    }

    #[test]
    fn test_raw_daily_event_conversion() {
        let raw = RawDailyEvent {
            product_id: "p1".into(),
            date: "2025-03-07".into(),
            views: 10,
            purchases: 2,
            add_to_carts: 4,
            revenue: 39.98,
        };
        let event = DailyEvent::try_from(raw).unwrap();
        assert_eq!(event.date, NaiveDate::from_ymd_opt(2025, 3, 7).unwrap());
        assert_eq!(event.purchases, 2);
    }

    #[test]
    fn test_raw_rating_range_rejected() {
        for rating in [0, 6, -1] {
            let raw = RawRatingEvent {
                product_id: "p1".into(),
                created_at: "2025-03-07".into(),
                rating,
            };
            let err = RatingEvent::try_from(raw).unwrap_err();
            assert!(matches!(err, FeatureError::InvalidRating { .. }));
        }
    }

    #[test]
    fn test_index_buckets_by_key() {
        let tables = InputTables::new()
            .with_daily_events(vec![
                DailyEvent {
                    product_id: "p1".into(),
                    date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                    views: 1,
                    purchases: 1,
                    add_to_carts: 0,
                    revenue: 1.0,
                },
                DailyEvent {
                    product_id: "p2".into(),
                    date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                    views: 2,
                    purchases: 0,
                    add_to_carts: 0,
                    revenue: 0.0,
                },
                DailyEvent {
                    product_id: "p1".into(),
                    date: NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
                    views: 3,
                    purchases: 1,
                    add_to_carts: 1,
                    revenue: 2.5,
                },
            ])
            .with_price_facts(vec![PriceFact {
                variant_id: "v1".into(),
                product_id: "p1".into(),
                price: 10.0,
            }]);

        let index = EntityIndex::build(&tables);
        assert_eq!(index.events_for("p1").len(), 2);
        assert_eq!(index.events_for("p2").len(), 1);
        assert!(index.events_for("p3").is_empty());
        assert_eq!(index.price_facts_for("p1").len(), 1);
        assert!(index.updates_for("v1").is_empty());
    }
}
