use crate::session::Sessions;
use crate::storage::DiaryStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<DiaryStore>,
    pub sessions: Sessions,
}

impl AppState {
    pub fn new(store: DiaryStore) -> Self {
        Self {
            store: Arc::new(store),
            sessions: Sessions::default(),
        }
    }
}
