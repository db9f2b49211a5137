//! Per-user conversation state.

use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
    time::{Duration, Instant},
};

use shared::domain::UserId;
use tokio::{
    sync::{Mutex, OwnedMutexGuard},
    task::JoinHandle,
};
use tracing::debug;

use crate::state::{AdminState, LookupState};

pub const RATE_WINDOW: Duration = Duration::from_secs(60);
pub const DEFAULT_SESSION_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone, Default)]
pub struct Session {
    pub lookup: LookupState,
    pub admin: Option<AdminState>,
    recent_events: VecDeque<Instant>,
    throttle_notified: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    /// First rejected event in a window; the user should be told once.
    Notify,
    Dropped,
}

impl Session {
    pub fn reset(&mut self) {
        self.lookup = LookupState::Idle;
        self.admin = None;
    }

    /// Sliding-window rate limit. A limit of zero disables it.
    pub fn admit(&mut self, now: Instant, limit: usize) -> Admission {
        if limit == 0 {
            return Admission::Allowed;
        }

        while let Some(oldest) = self.recent_events.front() {
            if now.saturating_duration_since(*oldest) >= RATE_WINDOW {
                self.recent_events.pop_front();
            } else {
                break;
            }
        }

        if self.recent_events.len() < limit {
            self.recent_events.push_back(now);
            self.throttle_notified = false;
            return Admission::Allowed;
        }

        if self.throttle_notified {
            Admission::Dropped
        } else {
            self.throttle_notified = true;
            Admission::Notify
        }
    }
}

struct Slot {
    session: Arc<Mutex<Session>>,
    touched: Instant,
}

/// In-memory session storage keyed by user.
///
/// Each session sits behind its own lock so one user's events are handled
/// in order while different users proceed concurrently.
#[derive(Clone, Default)]
pub struct SessionStore {
    slots: Arc<Mutex<HashMap<UserId, Slot>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the session for `user_id`, creating it on first use.
    pub async fn acquire(&self, user_id: UserId) -> OwnedMutexGuard<Session> {
        let session = {
            let mut slots = self.slots.lock().await;
            let slot = slots.entry(user_id).or_insert_with(|| Slot {
                session: Arc::default(),
                touched: Instant::now(),
            });
            slot.touched = Instant::now();
            Arc::clone(&slot.session)
        };
        session.lock_owned().await
    }

    /// Snapshot of the session, if one exists.
    pub async fn get(&self, user_id: UserId) -> Option<Session> {
        let session = {
            let slots = self.slots.lock().await;
            Arc::clone(&slots.get(&user_id)?.session)
        };
        let snapshot = session.lock().await.clone();
        Some(snapshot)
    }

    pub async fn set(&self, user_id: UserId, session: Session) {
        let mut guard = self.acquire(user_id).await;
        *guard = session;
    }

    pub async fn expire(&self, user_id: UserId) -> bool {
        self.slots.lock().await.remove(&user_id).is_some()
    }

    /// Drops sessions idle for at least `max_age` that nobody currently holds.
    pub async fn sweep(&self, max_age: Duration) -> usize {
        let now = Instant::now();
        let mut slots = self.slots.lock().await;
        let before = slots.len();
        slots.retain(|_, slot| {
            let in_use = Arc::strong_count(&slot.session) > 1;
            in_use || now.saturating_duration_since(slot.touched) < max_age
        });
        before - slots.len()
    }

    pub async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn spawn_sweeper(&self, every: Duration, max_age: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = store.sweep(max_age).await;
                if removed > 0 {
                    debug!(removed, "expired idle sessions");
                }
            }
        })
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
