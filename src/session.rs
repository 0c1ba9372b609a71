use chrono::NaiveDate;
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

pub const SESSION_HEADER: &str = "x-diary-session";
pub const SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const MAX_SESSIONS: usize = 10_000;

/// Per-session key-value context handed to the handlers that need it.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    values: HashMap<String, String>,
}

impl SessionContext {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn weekly_goal(&self, week_start: NaiveDate) -> Option<&str> {
        self.get(&goal_key(week_start))
    }

    pub fn set_weekly_goal(&mut self, week_start: NaiveDate, goal: impl Into<String>) {
        self.set(goal_key(week_start), goal);
    }
}

pub fn goal_key(week_start: NaiveDate) -> String {
    format!("goal_{}", week_start.format("%Y%m%d"))
}

struct Slot {
    context: SessionContext,
    touched: Instant,
}

/// Session contexts keyed by the client's session id.
///
/// A session lapses `ttl` after its last write. At most `capacity` sessions
/// are held; a new one displaces the least recently written.
#[derive(Clone)]
pub struct Sessions {
    inner: Arc<Mutex<HashMap<String, Slot>>>,
    ttl: Duration,
    capacity: usize,
}

impl Default for Sessions {
    fn default() -> Self {
        Self::with_limits(SESSION_TTL, MAX_SESSIONS)
    }
}

impl Sessions {
    pub fn with_limits(ttl: Duration, capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// Copy of the session's context; an unknown or lapsed id yields an empty one.
    pub async fn context(&self, id: &str) -> SessionContext {
        let mut sessions = self.inner.lock().await;
        if sessions
            .get(id)
            .is_some_and(|slot| slot.touched.elapsed() >= self.ttl)
        {
            sessions.remove(id);
        }
        sessions
            .get(id)
            .map(|slot| slot.context.clone())
            .unwrap_or_default()
    }

    pub async fn update<R>(&self, id: &str, f: impl FnOnce(&mut SessionContext) -> R) -> R {
        let mut sessions = self.inner.lock().await;
        let ttl = self.ttl;
        sessions.retain(|_, slot| slot.touched.elapsed() < ttl);

        if !sessions.contains_key(id) && sessions.len() >= self.capacity {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, slot)| slot.touched)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                sessions.remove(&oldest);
            }
        }

        let slot = sessions.entry(id.to_string()).or_insert_with(|| Slot {
            context: SessionContext::default(),
            touched: Instant::now(),
        });
        slot.touched = Instant::now();
        f(&mut slot.context)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
