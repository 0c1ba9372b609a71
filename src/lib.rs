pub mod app;
pub mod config;
pub mod errors;
pub mod export;
pub mod handlers;
pub mod models;
pub mod query;
pub mod remote;
pub mod report;
pub mod session;
pub mod state;
pub mod stats;
pub mod storage;
pub mod tags;
pub mod text;

pub use app::router;
pub use config::Config;
pub use state::AppState;
pub use storage::DiaryStore;
