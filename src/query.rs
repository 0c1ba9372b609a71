use crate::models::Entry;
use crate::tags::{Activity, Health, Weather};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    DateDesc,
    DateAsc,
    RatingDesc,
    RatingAsc,
}

/// Listing filters, as taken from the query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntryQuery {
    /// Case-insensitive substring of content or memo.
    pub q: Option<String>,
    pub weather: Option<Weather>,
    pub health: Option<Health>,
    pub rating: Option<u8>,
    /// Comma-separated activity labels; an entry matches if it has any of them.
    pub activities: Option<String>,
    #[serde(default)]
    pub sort: SortOrder,
}

impl EntryQuery {
    pub fn activity_filter(&self) -> Result<Vec<Activity>, String> {
        let Some(raw) = self.activities.as_deref() else {
            return Ok(Vec::new());
        };
        raw.split(',')
            .filter(|label| !label.trim().is_empty())
            .map(|label| {
                Activity::from_label(label).ok_or_else(|| format!("unknown activity {label:?}"))
            })
            .collect()
    }

    pub fn matches(&self, entry: &Entry, activities: &[Activity]) -> bool {
        if let Some(q) = self.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let needle = q.to_lowercase();
            if !entry.content.to_lowercase().contains(&needle)
                && !entry.memo.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        if self.weather.is_some_and(|weather| entry.weather != weather) {
            return false;
        }
        if self.health.is_some_and(|health| entry.health != health) {
            return false;
        }
        if self.rating.is_some_and(|rating| entry.rating != rating) {
            return false;
        }
        activities.is_empty() || activities.iter().any(|a| entry.activities.contains(a))
    }

    /// Filters then sorts; the sort is stable.
    pub fn apply(&self, entries: Vec<Entry>) -> Result<Vec<Entry>, String> {
        let activities = self.activity_filter()?;
        let mut selected: Vec<Entry> = entries
            .into_iter()
            .filter(|entry| self.matches(entry, &activities))
            .collect();

        match self.sort {
            SortOrder::DateDesc => selected.sort_by(|a, b| b.date.cmp(&a.date)),
            SortOrder::DateAsc => selected.sort_by_key(|entry| entry.date),
            SortOrder::RatingDesc => selected.sort_by(|a, b| b.rating.cmp(&a.rating)),
            SortOrder::RatingAsc => selected.sort_by_key(|entry| entry.rating),
        }
        Ok(selected)
    }
}
