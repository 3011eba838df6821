//! Statistics types and filters

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Object category tracked by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Car,
    Bicycle,
    Person,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Car => "car",
            Category::Bicycle => "bicycle",
            Category::Person => "person",
        }
    }
}

/// Category filter for the hourly profile ("only X" zeroes the others)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryFilter {
    #[default]
    All,
    Car,
    Bicycle,
    Person,
}

impl CategoryFilter {
    pub fn includes(&self, category: Category) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Car => category == Category::Car,
            CategoryFilter::Bicycle => category == Category::Bicycle,
            CategoryFilter::Person => category == Category::Person,
        }
    }
}

/// Line-crossing lane filter for IN/OUT totals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaneFilter {
    #[default]
    All,
    Lc1,
    Lc2,
}

/// Day selection for aggregation: a stored calendar day, or today up to now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaySelector {
    Current,
    Date(NaiveDate),
}

impl DaySelector {
    /// Parse the query form: `current` or `YYYY-MM-DD`.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.eq_ignore_ascii_case("current") {
            return Some(DaySelector::Current);
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .map(DaySelector::Date)
    }
}

/// 24 ordered per-hour values for each category
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HourlyProfile {
    pub car: [i64; 24],
    pub bicycle: [i64; 24],
    pub person: [i64; 24],
}

impl Default for HourlyProfile {
    fn default() -> Self {
        Self {
            car: [0; 24],
            bicycle: [0; 24],
            person: [0; 24],
        }
    }
}

/// Latest cumulative totals, zero-filled when no data is stored yet
#[derive(Debug, Clone, Default, Serialize)]
pub struct LatestTotals {
    pub timestamp: Option<String>,
    pub car_total: i64,
    pub bicycle_total: i64,
    pub person_total: i64,
    pub lc1_entry: i64,
    pub lc1_exit: i64,
    pub lc2_entry: i64,
    pub lc2_exit: i64,
    pub roi_car: i64,
    pub roi_bicycle: i64,
    pub roi_person: i64,
}

/// Category share of the latest cumulative totals, percent
#[derive(Debug, Clone, Default, Serialize)]
pub struct Distribution {
    pub car_pct: f64,
    pub bicycle_pct: f64,
    pub person_pct: f64,
}

/// Dashboard overview block
#[derive(Debug, Clone, Default, Serialize)]
pub struct Overview {
    pub total_in: i64,
    pub total_out: i64,
    pub current_stay: i64,
    pub record_count: i64,
    pub distribution: Distribution,
}

/// Reconciled non-negative totals for one day
#[derive(Debug, Clone, Default, Serialize)]
pub struct DayTotals {
    pub lc1_entry: i64,
    pub lc1_exit: i64,
    pub lc2_entry: i64,
    pub lc2_exit: i64,
    pub roi_car: i64,
    pub roi_bicycle: i64,
    pub roi_person: i64,
}
