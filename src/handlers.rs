use crate::errors::{AppError, AppResult};
use crate::export::{backup_json, export_csv, import_csv};
use crate::models::{
    Entry, GoalRequest, HabitQuery, Metric, ReplaceResponse, UpsertOutcome, UpsertResponse,
};
use crate::query::EntryQuery;
use crate::report::{self, CalendarDay, HabitSummary, WeekRange, WeeklyReport};
use crate::session::{SESSION_HEADER, SessionContext};
use crate::state::AppState;
use crate::stats::{self, AdvancedReport, StatsReport};
use crate::storage::duplicate_date;
use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;

pub async fn health() -> &'static str {
    "ok"
}

pub async fn list_entries(
    State(state): State<AppState>,
    Query(query): Query<EntryQuery>,
) -> AppResult<Json<Vec<Entry>>> {
    let entries = state.store.load().await?;
    let listed = query.apply(entries).map_err(AppError::bad_request)?;
    Ok(Json(listed))
}

pub async fn upsert_entry(
    State(state): State<AppState>,
    Json(entry): Json<Entry>,
) -> AppResult<(StatusCode, Json<UpsertResponse>)> {
    entry.validate().map_err(AppError::Validation)?;

    let outcome = state.store.upsert(entry.clone()).await?;
    let status = match outcome {
        UpsertOutcome::Created => StatusCode::CREATED,
        UpsertOutcome::Updated => StatusCode::OK,
    };
    Ok((status, Json(UpsertResponse { outcome, entry })))
}

pub async fn get_entry(
    State(state): State<AppState>,
    Path(date): Path<NaiveDate>,
) -> AppResult<Json<Entry>> {
    state
        .store
        .get_by_date(date)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("no entry for {date}")))
}

pub async fn delete_all(State(state): State<AppState>) -> AppResult<Json<ReplaceResponse>> {
    let revision = state.store.replace_all(&[], "Delete all diary entries").await?;
    Ok(Json(ReplaceResponse {
        entries: 0,
        revision: revision.to_string(),
    }))
}

pub async fn export_entries(
    State(state): State<AppState>,
    Query(query): Query<EntryQuery>,
) -> AppResult<Response> {
    let entries = query
        .apply(state.store.load().await?)
        .map_err(AppError::bad_request)?;
    let csv = export_csv(&entries).map_err(AppError::internal)?;
    Ok(attachment("text/csv; charset=utf-8", "my_diary_export.csv", csv))
}

pub async fn backup(State(state): State<AppState>) -> AppResult<Response> {
    let entries = state.store.load().await?;
    let json = backup_json(&entries).map_err(AppError::internal)?;
    Ok(attachment("application/json", "diary_backup.json", json))
}

pub async fn restore(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<Json<ReplaceResponse>> {
    let entries: Vec<Entry> = serde_json::from_slice(&body).map_err(|err| {
        AppError::bad_request(format!("backup is not a diary JSON array: {err}"))
    })?;
    replace_from_upload(&state, entries, "Restore diary from JSON backup").await
}

pub async fn restore_csv(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<Json<ReplaceResponse>> {
    let entries = import_csv(&body).map_err(|err| {
        AppError::bad_request(format!("backup is not a diary CSV export: {err}"))
    })?;
    replace_from_upload(&state, entries, "Restore diary from CSV backup").await
}

async fn replace_from_upload(
    state: &AppState,
    entries: Vec<Entry>,
    message: &str,
) -> AppResult<Json<ReplaceResponse>> {
    if let Some(date) = duplicate_date(&entries) {
        return Err(AppError::bad_request(format!(
            "backup contains more than one entry for {date}"
        )));
    }
    let revision = state.store.replace_all(&entries, message).await?;
    Ok(Json(ReplaceResponse {
        entries: entries.len(),
        revision: revision.to_string(),
    }))
}

pub async fn calendar(
    State(state): State<AppState>,
    Path((year, month)): Path<(i32, u32)>,
) -> AppResult<Json<Vec<[Option<CalendarDay>; 7]>>> {
    let entries = state.store.load().await?;
    report::month_calendar(&entries, year, month)
        .map(Json)
        .ok_or_else(|| AppError::bad_request(format!("invalid month {year}-{month}")))
}

pub async fn get_stats(State(state): State<AppState>) -> AppResult<Json<Metric<StatsReport>>> {
    let entries = state.store.load().await?;
    Ok(Json(stats::build_stats(&entries)))
}

pub async fn get_advanced_stats(
    State(state): State<AppState>,
) -> AppResult<Json<Metric<AdvancedReport>>> {
    let entries = state.store.load().await?;
    Ok(Json(stats::build_advanced(&entries)))
}

pub async fn habits(
    State(state): State<AppState>,
    Query(query): Query<HabitQuery>,
) -> AppResult<Json<HabitSummary>> {
    let month = match query.month.as_deref() {
        Some(raw) => Some(report::parse_month(raw).ok_or_else(|| {
            AppError::bad_request(format!("month must be YYYY-MM, got {raw:?}"))
        })?),
        None => None,
    };

    let entries = state.store.load().await?;
    report::habit_summary(&entries, month)
        .map(Json)
        .ok_or_else(|| AppError::NotFound("no diary entries yet".into()))
}

pub async fn weeks(State(state): State<AppState>) -> AppResult<Json<Vec<WeekRange>>> {
    let entries = state.store.load().await?;
    Ok(Json(report::available_weeks(&entries)))
}

pub async fn weekly_report(
    State(state): State<AppState>,
    Path(week_start): Path<NaiveDate>,
    headers: HeaderMap,
) -> AppResult<Json<WeeklyReport>> {
    let session = match session_id(&headers) {
        Some(id) => state.sessions.context(&id).await,
        None => SessionContext::default(),
    };

    let entries = state.store.load().await?;
    report::weekly_report(&entries, week_start, &session)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("no entries in the week of {week_start}")))
}

pub async fn set_weekly_goal(
    State(state): State<AppState>,
    Path(week_start): Path<NaiveDate>,
    headers: HeaderMap,
    Json(payload): Json<GoalRequest>,
) -> AppResult<StatusCode> {
    let id = session_id(&headers)
        .ok_or_else(|| AppError::bad_request(format!("{SESSION_HEADER} header is required")))?;
    let week = WeekRange::containing(week_start);
    state
        .sessions
        .update(&id, |ctx| ctx.set_weekly_goal(week.start, payload.goal))
        .await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn weekly_export(
    State(state): State<AppState>,
    Path(week_start): Path<NaiveDate>,
) -> AppResult<Response> {
    let week = WeekRange::containing(week_start);
    let entries = report::week_entries(&state.store.load().await?, &week);
    if entries.is_empty() {
        return Err(AppError::NotFound(format!(
            "no entries in the week of {}",
            week.start
        )));
    }

    let csv = export_csv(&entries).map_err(AppError::internal)?;
    let filename = format!("weekly_summary_{}.csv", week.start.format("%Y%m%d"));
    Ok(attachment("text/csv; charset=utf-8", &filename, csv))
}

fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn attachment(content_type: &'static str, filename: &str, body: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}
