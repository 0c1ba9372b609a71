use crate::handlers;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post, put},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route(
            "/api/entries",
            get(handlers::list_entries)
                .post(handlers::upsert_entry)
                .delete(handlers::delete_all),
        )
        .route("/api/entries/:date", get(handlers::get_entry))
        .route("/api/export.csv", get(handlers::export_entries))
        .route("/api/backup", get(handlers::backup))
        .route("/api/restore", post(handlers::restore))
        .route("/api/restore/csv", post(handlers::restore_csv))
        .route("/api/calendar/:year/:month", get(handlers::calendar))
        .route("/api/stats", get(handlers::get_stats))
        .route("/api/stats/advanced", get(handlers::get_advanced_stats))
        .route("/api/habits", get(handlers::habits))
        .route("/api/reports/weeks", get(handlers::weeks))
        .route("/api/reports/weekly/:week_start", get(handlers::weekly_report))
        .route(
            "/api/reports/weekly/:week_start/goal",
            put(handlers::set_weekly_goal),
        )
        .route(
            "/api/reports/weekly/:week_start/export.csv",
            get(handlers::weekly_export),
        )
        .with_state(state)
}
