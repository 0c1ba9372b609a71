use crate::tags::{Activity, Health, Mood, Weather};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const DEFAULT_SLEEP_HOURS: f64 = 7.0;
pub const DEFAULT_RATING: u8 = 3;
pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

/// One diary record. The date is the unique key of the collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub date: NaiveDate,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub weather: Weather,
    #[serde(default)]
    pub health: Health,
    #[serde(default = "default_rating")]
    pub rating: u8,
    #[serde(default)]
    pub activities: BTreeSet<Activity>,
    #[serde(default)]
    pub mood: Mood,
    #[serde(default)]
    pub memo: String,
    #[serde(default = "default_sleep_hours")]
    pub sleep_hours: f64,
}

fn default_rating() -> u8 {
    DEFAULT_RATING
}

fn default_sleep_hours() -> f64 {
    DEFAULT_SLEEP_HOURS
}

impl Entry {
    pub fn new(date: NaiveDate, content: impl Into<String>, rating: u8) -> Self {
        Self {
            date,
            content: content.into(),
            weather: Weather::default(),
            health: Health::default(),
            rating,
            activities: BTreeSet::new(),
            mood: Mood::default(),
            memo: String::new(),
            sleep_hours: DEFAULT_SLEEP_HOURS,
        }
    }

    /// Checks the field ranges an upsert must satisfy.
    pub fn validate(&self) -> Result<(), String> {
        if !(MIN_RATING..=MAX_RATING).contains(&self.rating) {
            return Err(format!(
                "rating must be between {MIN_RATING} and {MAX_RATING}, got {}",
                self.rating
            ));
        }
        if !self.sleep_hours.is_finite() || !(0.0..=24.0).contains(&self.sleep_hours) {
            return Err(format!(
                "sleep_hours must be between 0 and 24, got {}",
                self.sleep_hours
            ));
        }
        if self.content.trim().is_empty() {
            return Err("content must not be empty".into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    Created,
    Updated,
}

#[derive(Debug, Serialize)]
pub struct UpsertResponse {
    pub outcome: UpsertOutcome,
    pub entry: Entry,
}

#[derive(Debug, Serialize)]
pub struct ReplaceResponse {
    pub entries: usize,
    pub revision: String,
}

#[derive(Debug, Deserialize)]
pub struct GoalRequest {
    pub goal: String,
}

#[derive(Debug, Deserialize)]
pub struct HabitQuery {
    /// `YYYY-MM`; defaults to the month of the latest entry.
    pub month: Option<String>,
}

/// A statistic that needs a minimum sample before it means anything.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Metric<T> {
    Available(T),
    InsufficientData,
}

impl<T> Metric<T> {
    pub fn from_option(value: Option<T>) -> Self {
        match value {
            Some(value) => Metric::Available(value),
            None => Metric::InsufficientData,
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Metric::Available(value) => Some(value),
            Metric::InsufficientData => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let entry: Entry =
            serde_json::from_str(r#"{"date": "2025-03-01", "content": "hello"}"#).unwrap();
        assert_eq!(entry.mood, Mood::Unset);
        assert_eq!(entry.sleep_hours, DEFAULT_SLEEP_HOURS);
        assert_eq!(entry.rating, DEFAULT_RATING);
        assert!(entry.activities.is_empty());
        assert!(entry.memo.is_empty());
    }

    #[test]
    fn duplicate_activities_collapse() {
        let entry: Entry = serde_json::from_str(
            r#"{"date": "2025-03-01", "content": "x", "activities": ["読書した", "運動した", "読書した"]}"#,
        )
        .unwrap();
        assert_eq!(entry.activities.len(), 2);
    }

    #[test]
    fn validate_rejects_out_of_range_fields() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert!(Entry::new(date, "ok", 3).validate().is_ok());
        assert!(Entry::new(date, "ok", 0).validate().is_err());
        assert!(Entry::new(date, "ok", 6).validate().is_err());
        assert!(Entry::new(date, "   ", 3).validate().is_err());

        let mut entry = Entry::new(date, "ok", 3);
        entry.sleep_hours = 24.5;
        assert!(entry.validate().is_err());
        entry.sleep_hours = f64::NAN;
        assert!(entry.validate().is_err());
    }

    #[test]
    fn metric_serializes_with_status_tag() {
        let json = serde_json::to_value(Metric::Available(0.5)).unwrap();
        assert_eq!(json, serde_json::json!({"status": "available", "value": 0.5}));
        let json = serde_json::to_value(Metric::<f64>::InsufficientData).unwrap();
        assert_eq!(json, serde_json::json!({"status": "insufficient_data"}));
    }
}
