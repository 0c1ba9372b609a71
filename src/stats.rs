use crate::models::{Entry, MAX_RATING, MIN_RATING, Metric};
use crate::tags::{Activity, Health, Mood, Weather};
use crate::text::{self, KeywordCount, Sentiment, SentimentMean};
use chrono::{Datelike, Duration, Local, NaiveDate, Weekday};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Fewer entries than this and the overview reports insufficient data.
pub const MIN_ENTRIES_FOR_STATS: usize = 3;
pub const ROLLING_WINDOW: usize = 7;
pub const KEYWORD_LIMIT: usize = 100;
const TOP_ACTIVITY_COUNT: usize = 3;
const DRIVER_LIMIT: usize = 5;
const STRONG_CORRELATION: f64 = 0.5;

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Pearson correlation; `None` below two points or when either series is constant.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let mean_x = mean(xs)?;
    let mean_y = mean(ys)?;

    let mut covariance = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        covariance += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x <= f64::EPSILON || var_y <= f64::EPSILON {
        return None;
    }
    Some(covariance / (var_x.sqrt() * var_y.sqrt()))
}

fn ratings(entries: &[Entry]) -> Vec<f64> {
    entries.iter().map(|entry| f64::from(entry.rating)).collect()
}

fn sorted_by_date(entries: &[Entry]) -> Vec<&Entry> {
    let mut sorted: Vec<&Entry> = entries.iter().collect();
    sorted.sort_by_key(|entry| entry.date);
    sorted
}

// ---- streaks ----

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Streaks {
    /// Run of consecutive days ending at the most recent recorded date.
    pub current: u32,
    pub longest: u32,
}

pub fn streaks(entries: &[Entry]) -> Streaks {
    let mut dates: Vec<NaiveDate> = entries.iter().map(|entry| entry.date).collect();
    dates.sort_unstable();
    dates.dedup();

    if dates.is_empty() {
        return Streaks {
            current: 0,
            longest: 0,
        };
    }

    let mut longest = 1;
    let mut run = 1;
    for pair in dates.windows(2) {
        if pair[1] - pair[0] == Duration::days(1) {
            run += 1;
        } else {
            longest = longest.max(run);
            run = 1;
        }
    }
    longest = longest.max(run);

    // The final run of the scan is the one ending at the latest date.
    Streaks {
        current: run,
        longest,
    }
}

// ---- rolling average ----

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollingPoint {
    pub date: NaiveDate,
    pub rating: u8,
    pub rolling_avg: Option<f64>,
}

/// Trailing mean of the last `ROLLING_WINDOW` ratings in date order.
pub fn rolling_average(entries: &[Entry]) -> Vec<RollingPoint> {
    let sorted = sorted_by_date(entries);
    let series: Vec<f64> = sorted.iter().map(|entry| f64::from(entry.rating)).collect();

    sorted
        .iter()
        .enumerate()
        .map(|(i, entry)| RollingPoint {
            date: entry.date,
            rating: entry.rating,
            rolling_avg: (i + 1 >= ROLLING_WINDOW)
                .then(|| mean(&series[i + 1 - ROLLING_WINDOW..=i]))
                .flatten(),
        })
        .collect()
}

// ---- grouped means ----

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMean<K> {
    pub key: K,
    pub mean: f64,
    pub count: usize,
}

/// Mean rating per key, in key order. An entry contributes to every key it yields.
pub fn group_means<K, I, F>(entries: &[Entry], keys: F) -> Vec<GroupMean<K>>
where
    K: Ord,
    I: IntoIterator<Item = K>,
    F: Fn(&Entry) -> I,
{
    let mut groups: BTreeMap<K, (f64, usize)> = BTreeMap::new();
    for entry in entries {
        for key in keys(entry) {
            let group = groups.entry(key).or_insert((0.0, 0));
            group.0 += f64::from(entry.rating);
            group.1 += 1;
        }
    }

    groups
        .into_iter()
        .map(|(key, (sum, count))| GroupMean {
            key,
            mean: sum / count as f64,
            count,
        })
        .collect()
}

/// Highest mean; on a tie the smaller key wins.
pub fn best_group<K>(groups: &[GroupMean<K>]) -> Option<&GroupMean<K>> {
    groups.iter().fold(None, |best, group| match best {
        Some(current) if current.mean >= group.mean => Some(current),
        _ => Some(group),
    })
}

/// Groups ordered by descending mean, ties by key.
pub fn ranked<K: Clone>(groups: &[GroupMean<K>]) -> Vec<GroupMean<K>> {
    let mut ranked = groups.to_vec();
    ranked.sort_by(|a, b| b.mean.total_cmp(&a.mean));
    ranked
}

/// Weekday ordered Monday first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayOfWeek(pub Weekday);

impl DayOfWeek {
    pub fn name(self) -> &'static str {
        match self.0 {
            Weekday::Mon => "Monday",
            Weekday::Tue => "Tuesday",
            Weekday::Wed => "Wednesday",
            Weekday::Thu => "Thursday",
            Weekday::Fri => "Friday",
            Weekday::Sat => "Saturday",
            Weekday::Sun => "Sunday",
        }
    }
}

impl PartialOrd for DayOfWeek {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DayOfWeek {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0
            .num_days_from_monday()
            .cmp(&other.0.num_days_from_monday())
    }
}

impl Serialize for DayOfWeek {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Sleep duration rounded to the nearest half hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SleepBucket(u32);

impl SleepBucket {
    pub fn of(hours: f64) -> Self {
        Self((hours.clamp(0.0, 24.0) * 2.0).round() as u32)
    }

    pub fn hours(self) -> f64 {
        f64::from(self.0) / 2.0
    }
}

impl Serialize for SleepBucket {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.hours())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryBreakdown<K> {
    pub groups: Vec<GroupMean<K>>,
    pub best: Option<GroupMean<K>>,
}

impl<K: Clone> CategoryBreakdown<K> {
    fn from_groups(groups: Vec<GroupMean<K>>) -> Self {
        let best = best_group(&groups).cloned();
        Self { groups, best }
    }
}

pub fn weather_means(entries: &[Entry]) -> CategoryBreakdown<Weather> {
    CategoryBreakdown::from_groups(group_means(entries, |entry| Some(entry.weather)))
}

pub fn health_means(entries: &[Entry]) -> CategoryBreakdown<Health> {
    CategoryBreakdown::from_groups(group_means(entries, |entry| Some(entry.health)))
}

pub fn mood_means(entries: &[Entry]) -> CategoryBreakdown<Mood> {
    CategoryBreakdown::from_groups(group_means(entries, |entry| {
        entry.mood.is_set().then_some(entry.mood)
    }))
}

pub fn weekday_means(entries: &[Entry]) -> CategoryBreakdown<DayOfWeek> {
    CategoryBreakdown::from_groups(group_means(entries, |entry| {
        Some(DayOfWeek(entry.date.weekday()))
    }))
}

pub fn activity_means(entries: &[Entry]) -> CategoryBreakdown<Activity> {
    CategoryBreakdown::from_groups(group_means(entries, |entry| {
        entry.activities.iter().copied().collect::<Vec<_>>()
    }))
}

pub fn sleep_means(entries: &[Entry]) -> CategoryBreakdown<SleepBucket> {
    CategoryBreakdown::from_groups(group_means(entries, |entry| {
        Some(SleepBucket::of(entry.sleep_hours))
    }))
}

// ---- sleep / rating correlation ----

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SleepTrend {
    LongerSleepHigherRating,
    LongerSleepLowerRating,
    NoClearRelation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SleepCorrelation {
    pub coefficient: f64,
    pub trend: SleepTrend,
}

pub fn sleep_correlation(entries: &[Entry]) -> Metric<SleepCorrelation> {
    let sleep: Vec<f64> = entries.iter().map(|entry| entry.sleep_hours).collect();
    let coefficient = pearson(&sleep, &ratings(entries));
    Metric::from_option(coefficient.map(|coefficient| SleepCorrelation {
        coefficient,
        trend: if coefficient > STRONG_CORRELATION {
            SleepTrend::LongerSleepHigherRating
        } else if coefficient < -STRONG_CORRELATION {
            SleepTrend::LongerSleepLowerRating
        } else {
            SleepTrend::NoClearRelation
        },
    }))
}

// ---- overview ----

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingCount {
    pub rating: u8,
    pub days: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekComparison {
    pub this_week_mean: f64,
    pub last_week_mean: f64,
    pub delta: f64,
}

#[derive(Debug, Serialize)]
pub struct StatsReport {
    pub entry_count: usize,
    pub mean_rating: f64,
    pub five_star_days: usize,
    pub rating_distribution: Vec<RatingCount>,
    pub rolling: Vec<RollingPoint>,
    pub week_over_week: Option<WeekComparison>,
    pub weather: CategoryBreakdown<Weather>,
    pub health: CategoryBreakdown<Health>,
    pub mood: CategoryBreakdown<Mood>,
    pub weekday: CategoryBreakdown<DayOfWeek>,
    pub activities: CategoryBreakdown<Activity>,
    pub top_activities: Vec<GroupMean<Activity>>,
    pub sleep: CategoryBreakdown<SleepBucket>,
    pub sleep_correlation: Metric<SleepCorrelation>,
    pub keywords: Vec<KeywordCount>,
    pub sentiment: Vec<SentimentMean>,
    pub best_sentiment: Option<Sentiment>,
}

pub fn rating_distribution(entries: &[Entry]) -> Vec<RatingCount> {
    (MIN_RATING..=MAX_RATING)
        .map(|rating| RatingCount {
            rating,
            days: entries.iter().filter(|entry| entry.rating == rating).count(),
        })
        .collect()
}

/// Last 7 days up to `today` against the 7 days before them.
pub fn week_over_week(today: NaiveDate, entries: &[Entry]) -> Option<WeekComparison> {
    let week_ago = today - Duration::days(7);
    let two_weeks_ago = today - Duration::days(14);

    let window_mean = |from: NaiveDate, until: NaiveDate, inclusive: bool| {
        let ratings: Vec<f64> = entries
            .iter()
            .filter(|entry| {
                entry.date >= from && (entry.date < until || (inclusive && entry.date == until))
            })
            .map(|entry| f64::from(entry.rating))
            .collect();
        mean(&ratings)
    };

    let this_week_mean = window_mean(week_ago, today, true)?;
    let last_week_mean = window_mean(two_weeks_ago, week_ago, false)?;
    Some(WeekComparison {
        this_week_mean,
        last_week_mean,
        delta: this_week_mean - last_week_mean,
    })
}

pub fn build_stats(entries: &[Entry]) -> Metric<StatsReport> {
    build_stats_at(Local::now().date_naive(), entries)
}

pub fn build_stats_at(today: NaiveDate, entries: &[Entry]) -> Metric<StatsReport> {
    if entries.len() < MIN_ENTRIES_FOR_STATS {
        return Metric::InsufficientData;
    }

    let activities = activity_means(entries);
    let mut top_activities = ranked(&activities.groups);
    top_activities.truncate(TOP_ACTIVITY_COUNT);

    let sentiment = text::sentiment_means(entries);
    let best_sentiment = text::best_sentiment(&sentiment).map(|bucket| bucket.sentiment);

    Metric::Available(StatsReport {
        entry_count: entries.len(),
        mean_rating: mean(&ratings(entries)).unwrap_or_default(),
        five_star_days: entries
            .iter()
            .filter(|entry| entry.rating == MAX_RATING)
            .count(),
        rating_distribution: rating_distribution(entries),
        rolling: rolling_average(entries),
        week_over_week: week_over_week(today, entries),
        weather: weather_means(entries),
        health: health_means(entries),
        mood: mood_means(entries),
        weekday: weekday_means(entries),
        activities,
        top_activities,
        sleep: sleep_means(entries),
        sleep_correlation: sleep_correlation(entries),
        keywords: text::keyword_frequency(entries, KEYWORD_LIMIT),
        sentiment,
        best_sentiment,
    })
}

// ---- advanced: weekly heatmap and rating drivers ----

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapRow {
    pub week: String,
    pub start_date: NaiveDate,
    /// Mean rating per weekday, Monday first.
    pub cells: [Option<f64>; 7],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Heatmap {
    pub rows: Vec<HeatmapRow>,
    pub best_week: Option<String>,
}

pub fn weekly_heatmap(entries: &[Entry]) -> Heatmap {
    let mut weeks: BTreeMap<NaiveDate, [Vec<f64>; 7]> = BTreeMap::new();
    for entry in entries {
        let slot = entry.date.weekday().num_days_from_monday() as usize;
        weeks.entry(week_start(entry.date)).or_default()[slot].push(f64::from(entry.rating));
    }

    let rows: Vec<HeatmapRow> = weeks
        .into_iter()
        .map(|(start, days)| HeatmapRow {
            week: week_label(start),
            start_date: start,
            cells: days.map(|ratings| mean(&ratings)),
        })
        .collect();

    let mut best: Option<(&HeatmapRow, f64)> = None;
    for row in &rows {
        let present: Vec<f64> = row.cells.iter().flatten().copied().collect();
        if let Some(row_mean) = mean(&present) {
            if best.is_none_or(|(_, best_mean)| row_mean > best_mean) {
                best = Some((row, row_mean));
            }
        }
    }
    let best_week = best.map(|(row, _)| row.week.clone());

    Heatmap { rows, best_week }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strength {
    Strong,
    Weak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Positive,
    Negative,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingDriver {
    pub feature: String,
    pub correlation: f64,
    pub strength: Strength,
    pub direction: Direction,
}

/// Candidate features: sleep hours plus a 0/1 indicator for every tag and weekday seen.
fn feature_columns(entries: &[Entry]) -> Vec<(String, Vec<f64>)> {
    fn indicator<K: Ord + Copy>(
        entries: &[Entry],
        prefix: &str,
        label: impl Fn(K) -> String,
        has: impl Fn(&Entry, K) -> bool,
        present: impl Fn(&Entry) -> Vec<K>,
    ) -> Vec<(String, Vec<f64>)> {
        let mut keys: Vec<K> = entries.iter().flat_map(&present).collect();
        keys.sort();
        keys.dedup();
        keys.into_iter()
            .map(|key| {
                let column = entries
                    .iter()
                    .map(|entry| if has(entry, key) { 1.0 } else { 0.0 })
                    .collect();
                (format!("{prefix}_{}", label(key)), column)
            })
            .collect()
    }

    let mut columns = vec![(
        "sleep_hours".to_string(),
        entries.iter().map(|entry| entry.sleep_hours).collect(),
    )];
    columns.extend(indicator(
        entries,
        "weather",
        |w: Weather| w.label().to_string(),
        |entry, w| entry.weather == w,
        |entry| vec![entry.weather],
    ));
    columns.extend(indicator(
        entries,
        "health",
        |h: Health| h.label().to_string(),
        |entry, h| entry.health == h,
        |entry| vec![entry.health],
    ));
    columns.extend(indicator(
        entries,
        "mood",
        |m: Mood| m.label().to_string(),
        |entry, m| entry.mood == m,
        |entry| entry.mood.is_set().then_some(entry.mood).into_iter().collect(),
    ));
    columns.extend(indicator(
        entries,
        "activity",
        |a: Activity| a.label().to_string(),
        |entry, a| entry.activities.contains(&a),
        |entry| entry.activities.iter().copied().collect(),
    ));
    columns.extend(indicator(
        entries,
        "weekday",
        |d: DayOfWeek| d.name().to_string(),
        |entry, d| DayOfWeek(entry.date.weekday()) == d,
        |entry| vec![DayOfWeek(entry.date.weekday())],
    ));
    columns
}

/// Features most correlated with the rating, strongest positive first.
pub fn rating_drivers(entries: &[Entry], limit: usize) -> Vec<RatingDriver> {
    let rating = ratings(entries);
    let mut drivers: Vec<RatingDriver> = feature_columns(entries)
        .into_iter()
        .filter_map(|(feature, column)| {
            let correlation = pearson(&column, &rating)?;
            Some(RatingDriver {
                feature,
                correlation,
                strength: if correlation.abs() > STRONG_CORRELATION {
                    Strength::Strong
                } else {
                    Strength::Weak
                },
                direction: if correlation > 0.0 {
                    Direction::Positive
                } else {
                    Direction::Negative
                },
            })
        })
        .collect();

    drivers.sort_by(|a, b| b.correlation.total_cmp(&a.correlation));
    drivers.truncate(limit);
    drivers
}

#[derive(Debug, Serialize)]
pub struct AdvancedReport {
    pub heatmap: Heatmap,
    pub drivers: Vec<RatingDriver>,
}

pub fn build_advanced(entries: &[Entry]) -> Metric<AdvancedReport> {
    if entries.len() < MIN_ENTRIES_FOR_STATS {
        return Metric::InsufficientData;
    }
    Metric::Available(AdvancedReport {
        heatmap: weekly_heatmap(entries),
        drivers: rating_drivers(entries, DRIVER_LIMIT),
    })
}

pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

pub fn week_label(date: NaiveDate) -> String {
    let iso = date.iso_week();
    format!("{}-W{:02}", iso.year(), iso.week())
}
