//! In-memory conversation sessions.
//!
//! The outer map lock is held only to find or insert a session slot; each
//! session has its own lock so appends to one session never wait on another.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use admit_core::config::SessionConfig;

use crate::error::ChatError;
use crate::types::ConversationTurn;

/// One conversation's bounded history.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub turns: VecDeque<ConversationTurn>,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl Session {
    fn new(id: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: id.to_string(),
            turns: VecDeque::new(),
            created_at: now,
            last_active: now,
        }
    }
}

type Slot = Arc<Mutex<Session>>;

/// Process-lifetime session store keyed by opaque session id.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Slot>>,
    max_turns: usize,
    idle_timeout: Duration,
}

impl SessionStore {
    pub fn new(config: &SessionConfig) -> Self {
        Self::with_limits(
            config.max_turns,
            Duration::minutes(i64::from(config.idle_timeout_minutes)),
        )
    }

    pub fn with_limits(max_turns: usize, idle_timeout: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            max_turns: max_turns.max(1),
            idle_timeout,
        }
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    fn map(&self) -> Result<MutexGuard<'_, HashMap<String, Slot>>, ChatError> {
        self.sessions
            .lock()
            .map_err(|e| ChatError::LockPoisoned(e.to_string()))
    }

    fn is_expired(&self, session: &Session, now: DateTime<Utc>) -> bool {
        now - session.last_active > self.idle_timeout
    }

    /// Live session slot for `id`, if any.
    fn live_slot(&self, id: &str, now: DateTime<Utc>) -> Result<Option<Slot>, ChatError> {
        let map = self.map()?;
        let Some(slot) = map.get(id) else {
            return Ok(None);
        };
        let session = lock_session(slot)?;
        if self.is_expired(&session, now) {
            Ok(None)
        } else {
            Ok(Some(Arc::clone(slot)))
        }
    }

    /// Return the session for `id`, creating it if absent or expired.
    pub fn get_or_create(&self, id: &str) -> Result<Slot, ChatError> {
        self.get_or_create_at(id, Utc::now())
    }

    fn get_or_create_at(&self, id: &str, now: DateTime<Utc>) -> Result<Slot, ChatError> {
        let mut map = self.map()?;
        if let Some(slot) = map.get(id) {
            let expired = self.is_expired(&*lock_session(slot)?, now);
            if !expired {
                return Ok(Arc::clone(slot));
            }
            info!(session_id = %id, "Session expired, starting fresh");
        } else {
            debug!(session_id = %id, "Session created");
        }
        let slot = Arc::new(Mutex::new(Session::new(id, now)));
        map.insert(id.to_string(), Arc::clone(&slot));
        Ok(slot)
    }

    /// Append a turn, dropping the oldest turns beyond the bound.
    pub fn append(&self, id: &str, turn: ConversationTurn) -> Result<(), ChatError> {
        let now = Utc::now();
        let slot = self.get_or_create_at(id, now)?;
        let mut session = lock_session(&slot)?;
        session.turns.push_back(turn);
        while session.turns.len() > self.max_turns {
            session.turns.pop_front();
        }
        session.last_active = now;
        Ok(())
    }

    /// The last `m` turns of a session, oldest first. Empty for unknown ids.
    pub fn recent_turns(&self, id: &str, m: usize) -> Result<Vec<ConversationTurn>, ChatError> {
        let Some(slot) = self.live_slot(id, Utc::now())? else {
            return Ok(Vec::new());
        };
        let session = lock_session(&slot)?;
        let skip = session.turns.len().saturating_sub(m);
        Ok(session.turns.iter().skip(skip).cloned().collect())
    }

    /// Full history of a live session, or `None` if unknown or expired.
    pub fn history(&self, id: &str) -> Result<Option<Vec<ConversationTurn>>, ChatError> {
        let Some(slot) = self.live_slot(id, Utc::now())? else {
            return Ok(None);
        };
        let session = lock_session(&slot)?;
        Ok(Some(session.turns.iter().cloned().collect()))
    }

    /// Clear a session's turns. Returns false if the session is unknown.
    pub fn reset(&self, id: &str) -> Result<bool, ChatError> {
        let now = Utc::now();
        let Some(slot) = self.live_slot(id, now)? else {
            return Ok(false);
        };
        let mut session = lock_session(&slot)?;
        session.turns.clear();
        session.last_active = now;
        info!(session_id = %id, "Session reset");
        Ok(true)
    }

    /// Drop every expired session. Returns how many were removed.
    pub fn remove_expired(&self) -> Result<usize, ChatError> {
        self.remove_expired_at(Utc::now())
    }

    fn remove_expired_at(&self, now: DateTime<Utc>) -> Result<usize, ChatError> {
        let mut map = self.map()?;
        let before = map.len();
        let mut keep = HashMap::with_capacity(before);
        for (id, slot) in map.drain() {
            let expired = self.is_expired(&*lock_session(&slot)?, now);
            if !expired {
                keep.insert(id, slot);
            }
        }
        *map = keep;
        let removed = before - map.len();
        if removed > 0 {
            info!(removed, remaining = map.len(), "Expired sessions removed");
        }
        Ok(removed)
    }

    /// Number of stored sessions, expired ones included until swept.
    pub fn len(&self) -> usize {
        self.map().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lock_session(slot: &Slot) -> Result<MutexGuard<'_, Session>, ChatError> {
    slot.lock().map_err(|e| ChatError::LockPoisoned(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use admit_core::{ReplySource, Topic};

    fn turn(query: &str) -> ConversationTurn {
        ConversationTurn {
            query: query.to_string(),
            reply: format!("reply to {}", query),
            timestamp: Utc::now(),
            topic: Some(Topic::Fees),
            source: ReplySource::Quick,
        }
    }

    fn store(max_turns: usize) -> SessionStore {
        SessionStore::with_limits(max_turns, Duration::minutes(30))
    }

    fn queries(turns: &[ConversationTurn]) -> Vec<&str> {
        turns.iter().map(|t| t.query.as_str()).collect()
    }

    // ---- Basic operations ----

    #[test]
    fn test_get_or_create_returns_same_session() {
        let s = store(10);
        let a = s.get_or_create("abc").unwrap();
        let b = s.get_or_create("abc").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn test_append_preserves_order() {
        let s = store(10);
        s.append("abc", turn("first")).unwrap();
        s.append("abc", turn("second")).unwrap();
        let history = s.history("abc").unwrap().unwrap();
        assert_eq!(queries(&history), vec!["first", "second"]);
    }

    #[test]
    fn test_append_drops_oldest_beyond_bound() {
        let s = store(3);
        for q in ["q1", "q2", "q3", "q4", "q5"] {
            s.append("abc", turn(q)).unwrap();
            assert!(s.history("abc").unwrap().unwrap().len() <= 3);
        }
        let history = s.history("abc").unwrap().unwrap();
        assert_eq!(queries(&history), vec!["q3", "q4", "q5"]);
    }

    #[test]
    fn test_recent_turns() {
        let s = store(10);
        for q in ["q1", "q2", "q3"] {
            s.append("abc", turn(q)).unwrap();
        }
        assert_eq!(queries(&s.recent_turns("abc", 2).unwrap()), vec!["q2", "q3"]);
        assert_eq!(s.recent_turns("abc", 10).unwrap().len(), 3);
        assert!(s.recent_turns("abc", 0).unwrap().is_empty());
        assert!(s.recent_turns("unknown", 4).unwrap().is_empty());
    }

    #[test]
    fn test_sessions_are_isolated() {
        let s = store(10);
        s.append("a", turn("for a")).unwrap();
        s.append("b", turn("for b")).unwrap();
        assert_eq!(queries(&s.history("a").unwrap().unwrap()), vec!["for a"]);
        assert_eq!(queries(&s.history("b").unwrap().unwrap()), vec!["for b"]);
    }

    #[test]
    fn test_history_unknown_is_none() {
        let s = store(10);
        assert!(s.history("nope").unwrap().is_none());
        assert_eq!(s.len(), 0);
    }

    #[test]
    fn test_reset_clears_turns() {
        let s = store(10);
        s.append("abc", turn("q1")).unwrap();
        assert!(s.reset("abc").unwrap());
        assert!(s.history("abc").unwrap().unwrap().is_empty());
        assert!(!s.reset("unknown").unwrap());
    }

    // ---- Expiry ----

    #[test]
    fn test_expired_session_is_recreated() {
        let s = store(10);
        s.append("abc", turn("old")).unwrap();
        let later = Utc::now() + Duration::minutes(31);
        let slot = s.get_or_create_at("abc", later).unwrap();
        assert!(slot.lock().unwrap().turns.is_empty());
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn test_remove_expired() {
        let s = store(10);
        s.append("a", turn("q")).unwrap();
        s.append("b", turn("q")).unwrap();
        assert_eq!(s.remove_expired_at(Utc::now()).unwrap(), 0);
        assert_eq!(s.len(), 2);

        let later = Utc::now() + Duration::minutes(31);
        assert_eq!(s.remove_expired_at(later).unwrap(), 2);
        assert!(s.is_empty());
    }

    #[test]
    fn test_zero_max_turns_is_clamped() {
        let s = store(0);
        assert_eq!(s.max_turns(), 1);
        s.append("abc", turn("q1")).unwrap();
        s.append("abc", turn("q2")).unwrap();
        assert_eq!(queries(&s.history("abc").unwrap().unwrap()), vec!["q2"]);
    }

    // ---- Concurrency ----

    #[test]
    fn test_concurrent_appends_same_session() {
        let s = Arc::new(store(1000));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let s = Arc::clone(&s);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        s.append("shared", turn(&format!("t{}-{}", t, i))).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let history = s.history("shared").unwrap().unwrap();
        assert_eq!(history.len(), 400);
        // Each thread's turns keep their relative order
        for t in 0..8 {
            let prefix = format!("t{}-", t);
            let own: Vec<usize> = history
                .iter()
                .filter_map(|turn| turn.query.strip_prefix(&prefix))
                .map(|i| i.parse().unwrap())
                .collect();
            assert_eq!(own, (0..50).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_from_config() {
        let s = SessionStore::new(&SessionConfig::default());
        assert_eq!(s.max_turns(), 10);
    }
}
