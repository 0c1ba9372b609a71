//! Calendar, habit and weekly summary views over the diary.

use crate::models::Entry;
use crate::session::SessionContext;
use crate::stats::{self, Streaks, week_start};
use crate::tags::{Activity, Health, Mood, Weather};
use crate::text::{self, KeywordCount};
use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

const WEEKLY_KEYWORD_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarDay {
    pub day: u32,
    pub date: NaiveDate,
    pub recorded: bool,
    pub rating: Option<u8>,
    pub weather: Option<Weather>,
}

/// Monday-first weeks of `year`-`month`; cells outside the month are `None`.
pub fn month_calendar(
    entries: &[Entry],
    year: i32,
    month: u32,
) -> Option<Vec<[Option<CalendarDay>; 7]>> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let by_date: BTreeMap<NaiveDate, &Entry> = entries
        .iter()
        .filter(|entry| entry.date.year() == year && entry.date.month() == month)
        .map(|entry| (entry.date, entry))
        .collect();

    let mut weeks = Vec::new();
    let mut week: [Option<CalendarDay>; 7] = Default::default();
    let mut date = first;
    while date.month() == month {
        let slot = date.weekday().num_days_from_monday() as usize;
        let entry = by_date.get(&date);
        week[slot] = Some(CalendarDay {
            day: date.day(),
            date,
            recorded: entry.is_some(),
            rating: entry.map(|entry| entry.rating),
            weather: entry.map(|entry| entry.weather),
        });
        if slot == 6 {
            weeks.push(std::mem::take(&mut week));
        }
        date += Duration::days(1);
    }
    if week.iter().any(Option::is_some) {
        weeks.push(week);
    }

    Some(weeks)
}

#[derive(Debug, Serialize)]
pub struct HabitSummary {
    pub streaks: Streaks,
    /// Entries over the days between the first and last record, in percent.
    pub record_rate: u32,
    pub month: String,
    pub calendar: Vec<[Option<CalendarDay>; 7]>,
}

pub fn record_rate(entries: &[Entry]) -> u32 {
    let (Some(first), Some(last)) = (
        entries.iter().map(|entry| entry.date).min(),
        entries.iter().map(|entry| entry.date).max(),
    ) else {
        return 0;
    };
    let span = (last - first).num_days() + 1;
    (entries.len() as i64 * 100 / span) as u32
}

/// `None` for an empty diary or an invalid month.
pub fn habit_summary(entries: &[Entry], month: Option<(i32, u32)>) -> Option<HabitSummary> {
    let latest = entries.iter().map(|entry| entry.date).max()?;
    let (year, month) = month.unwrap_or((latest.year(), latest.month()));

    Some(HabitSummary {
        streaks: stats::streaks(entries),
        record_rate: record_rate(entries),
        month: format!("{year:04}-{month:02}"),
        calendar: month_calendar(entries, year, month)?,
    })
}

pub fn parse_month(raw: &str) -> Option<(i32, u32)> {
    let (year, month) = raw.trim().split_once('-')?;
    let year = year.parse().ok()?;
    let month = month.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, 1).map(|_| (year, month))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub label: String,
}

impl WeekRange {
    pub fn containing(date: NaiveDate) -> Self {
        let start = week_start(date);
        let end = start + Duration::days(6);
        Self {
            start,
            end,
            label: format!("{} - {}", start.format("%Y/%m/%d"), end.format("%Y/%m/%d")),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Weeks that have at least one entry, newest first.
pub fn available_weeks(entries: &[Entry]) -> Vec<WeekRange> {
    let mut starts: Vec<NaiveDate> = entries.iter().map(|entry| week_start(entry.date)).collect();
    starts.sort_unstable_by(|a, b| b.cmp(a));
    starts.dedup();
    starts.into_iter().map(WeekRange::containing).collect()
}

pub fn week_entries(entries: &[Entry], week: &WeekRange) -> Vec<Entry> {
    let mut selected: Vec<Entry> = entries
        .iter()
        .filter(|entry| week.contains(entry.date))
        .cloned()
        .collect();
    selected.sort_by_key(|entry| entry.date);
    selected
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagCount<K> {
    pub tag: K,
    pub count: usize,
}

/// Occurrences per tag, most frequent first; ties keep candidate order.
fn tag_counts<K: Ord + Copy>(tags: impl IntoIterator<Item = K>) -> Vec<TagCount<K>> {
    let mut counts: BTreeMap<K, usize> = BTreeMap::new();
    for tag in tags {
        *counts.entry(tag).or_default() += 1;
    }
    let mut counts: Vec<TagCount<K>> = counts
        .into_iter()
        .map(|(tag, count)| TagCount { tag, count })
        .collect();
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

#[derive(Debug, Serialize)]
pub struct WeeklyReport {
    pub week: WeekRange,
    pub entry_count: usize,
    /// Recorded days out of seven, in percent.
    pub completion_rate: u32,
    pub mean_rating: f64,
    pub previous_week_delta: Option<f64>,
    pub mean_sleep_hours: f64,
    pub health: Vec<TagCount<Health>>,
    pub mood: Vec<TagCount<Mood>>,
    pub activities: Vec<TagCount<Activity>>,
    pub most_common_activity: Option<TagCount<Activity>>,
    pub ratings: Vec<stats::RollingPoint>,
    pub best_day: Entry,
    pub keywords: Vec<KeywordCount>,
    pub goal: Option<String>,
}

fn mean_of(list: &[Entry], field: fn(&Entry) -> f64) -> Option<f64> {
    stats::mean(&list.iter().map(field).collect::<Vec<_>>())
}

fn rating(entry: &Entry) -> f64 {
    f64::from(entry.rating)
}

fn sleep_hours(entry: &Entry) -> f64 {
    entry.sleep_hours
}

/// Summary of the Monday-Sunday week containing `date`; `None` when it has no entries.
pub fn weekly_report(
    entries: &[Entry],
    date: NaiveDate,
    session: &SessionContext,
) -> Option<WeeklyReport> {
    let week = WeekRange::containing(date);
    let current = week_entries(entries, &week);
    // Earliest date wins a rating tie since `current` is date ordered.
    let best_day = current
        .iter()
        .fold(None::<&Entry>, |best, entry| match best {
            Some(best) if best.rating >= entry.rating => Some(best),
            _ => Some(entry),
        })?
        .clone();

    let mean_rating = mean_of(&current, rating)?;
    let previous = week_entries(entries, &WeekRange::containing(week.start - Duration::days(7)));
    let previous_week_delta = mean_of(&previous, rating).map(|prev| mean_rating - prev);

    let activities = tag_counts(current.iter().flat_map(|entry| entry.activities.iter().copied()));
    let most_common_activity = activities.first().cloned();

    Some(WeeklyReport {
        entry_count: current.len(),
        completion_rate: (current.len() * 100 / 7) as u32,
        mean_rating,
        previous_week_delta,
        mean_sleep_hours: mean_of(&current, sleep_hours).unwrap_or_default(),
        health: tag_counts(current.iter().map(|entry| entry.health)),
        mood: tag_counts(
            current
                .iter()
                .map(|entry| entry.mood)
                .filter(|mood| mood.is_set()),
        ),
        activities,
        most_common_activity,
        ratings: stats::rolling_average(&current)
            .into_iter()
            .map(|point| stats::RollingPoint {
                rolling_avg: None,
                ..point
            })
            .collect(),
        best_day,
        keywords: text::keyword_frequency(&current, WEEKLY_KEYWORD_LIMIT),
        goal: session.weekly_goal(week.start).map(str::to_string),
        week,
    })
}
