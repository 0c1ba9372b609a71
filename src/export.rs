use crate::models::Entry;
use crate::tags::{Activity, Health, Mood, Weather};
use chrono::NaiveDate;
use std::collections::BTreeSet;

/// UTF-8 byte-order mark; spreadsheet tools use it to pick the encoding.
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub const CSV_COLUMNS: [&str; 9] = [
    "date",
    "content",
    "weather",
    "health",
    "rating",
    "activities",
    "mood",
    "memo",
    "sleep_hours",
];

const ACTIVITY_SEPARATOR: char = ';';

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: expected {expected} columns, found {found}")]
    ColumnCount {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("row {row}: invalid {column} value {value:?}")]
    InvalidValue {
        row: usize,
        column: &'static str,
        value: String,
    },
}

pub fn export_csv(entries: &[Entry]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(UTF8_BOM.to_vec());
    writer.write_record(CSV_COLUMNS)?;

    for entry in entries {
        let activities = entry
            .activities
            .iter()
            .map(|activity| activity.label())
            .collect::<Vec<_>>()
            .join(&ACTIVITY_SEPARATOR.to_string());
        writer.write_record([
            entry.date.to_string(),
            entry.content.clone(),
            entry.weather.label().to_string(),
            entry.health.label().to_string(),
            entry.rating.to_string(),
            activities,
            entry.mood.label().to_string(),
            entry.memo.clone(),
            entry.sleep_hours.to_string(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))
}

/// Parses the format written by [`export_csv`].
pub fn import_csv(bytes: &[u8]) -> Result<Vec<Entry>, ImportError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes);

    let mut entries = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let row = index + 1;
        if record.len() != CSV_COLUMNS.len() {
            return Err(ImportError::ColumnCount {
                row,
                expected: CSV_COLUMNS.len(),
                found: record.len(),
            });
        }

        let field = |i: usize| record.get(i).unwrap_or_default();
        let invalid = |column: &'static str, value: &str| ImportError::InvalidValue {
            row,
            column,
            value: value.to_string(),
        };

        let date = NaiveDate::parse_from_str(field(0), "%Y-%m-%d")
            .map_err(|_| invalid("date", field(0)))?;
        let weather = Weather::from_label(field(2)).ok_or_else(|| invalid("weather", field(2)))?;
        let health = Health::from_label(field(3)).ok_or_else(|| invalid("health", field(3)))?;
        let rating = field(4).parse().map_err(|_| invalid("rating", field(4)))?;
        let activities = field(5)
            .split(ACTIVITY_SEPARATOR)
            .filter(|label| !label.trim().is_empty())
            .map(|label| Activity::from_label(label).ok_or_else(|| invalid("activities", label)))
            .collect::<Result<BTreeSet<_>, _>>()?;
        let mood = if field(6).trim().is_empty() {
            Mood::Unset
        } else {
            Mood::from_label(field(6)).ok_or_else(|| invalid("mood", field(6)))?
        };
        let sleep_hours = field(8)
            .parse()
            .map_err(|_| invalid("sleep_hours", field(8)))?;

        entries.push(Entry {
            date,
            content: field(1).to_string(),
            weather,
            health,
            rating,
            activities,
            mood,
            memo: field(7).to_string(),
            sleep_hours,
        });
    }

    Ok(entries)
}

pub fn backup_json(entries: &[Entry]) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec_pretty(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Entry> {
        let mut first = Entry::new(
            NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            "朝は雨、\n午後は \"晴れ\", 散歩した",
            4,
        );
        first.weather = Weather::Rain;
        first.health = Health::SlightlyTired;
        first.mood = Mood::Relaxed;
        first.memo = "memo, with comma".into();
        first.sleep_hours = 6.5;
        first.activities = [Activity::MoviesTv, Activity::Exercise, Activity::Reading]
            .into_iter()
            .collect();

        let mut second = Entry::new(NaiveDate::from_ymd_opt(2025, 5, 2).unwrap(), "short", 2);
        second.sleep_hours = 7.333333333333333;
        vec![first, second]
    }

    #[test]
    fn export_starts_with_bom_and_header() {
        let bytes = export_csv(&sample()).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        assert!(text.starts_with(
            "date,content,weather,health,rating,activities,mood,memo,sleep_hours\n"
        ));
    }

    #[test]
    fn export_then_import_preserves_entries() {
        let entries = sample();
        let imported = import_csv(&export_csv(&entries).unwrap()).unwrap();
        assert_eq!(imported, entries);
    }

    #[test]
    fn import_rejects_unknown_tags() {
        let csv = "date,content,weather,health,rating,activities,mood,memo,sleep_hours\n\
                   2025-05-01,x,hail,元気,3,,,,7\n";
        let err = import_csv(csv.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            ImportError::InvalidValue {
                row: 1,
                column: "weather",
                ..
            }
        ));
    }

    #[test]
    fn empty_mood_column_imports_as_unset() {
        let csv = "date,content,weather,health,rating,activities,mood,memo,sleep_hours\n\
                   2025-05-01,x,晴れ,元気,3,,,,7.5\n";
        let entries = import_csv(csv.as_bytes()).unwrap();
        assert_eq!(entries[0].mood, Mood::Unset);
        assert_eq!(entries[0].sleep_hours, 7.5);
    }
}
