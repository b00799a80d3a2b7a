use chrono::Utc;
use dashmap::DashMap;

/// Per-conversation state accumulated across webhook/chat turns.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub symptoms: Vec<String>,
    pub awaiting_confirmation: bool,
    pub last_seen_ms: i64,
}

/// In-memory conversation store keyed by Dialogflow session id. Sessions
/// idle longer than the TTL are dropped by a background task.
pub struct SessionStore {
    sessions: DashMap<String, SessionState>,
    ttl_ms: i64,
}

impl SessionStore {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl_ms: (ttl_secs as i64) * 1000,
        }
    }

    /// Merges newly reported symptoms into the session and returns the full
    /// accumulated, deduplicated set.
    pub fn add_symptoms<I>(&self, session_id: &str, new_symptoms: I) -> Vec<String>
    where
        I: IntoIterator<Item = String>,
    {
        let mut entry = self.sessions.entry(session_id.to_string()).or_default();
        for symptom in new_symptoms {
            if !entry.symptoms.contains(&symptom) {
                entry.symptoms.push(symptom);
            }
        }
        entry.last_seen_ms = Utc::now().timestamp_millis();
        entry.symptoms.clone()
    }

    pub fn symptoms(&self, session_id: &str) -> Vec<String> {
        self.sessions
            .get(session_id)
            .map(|s| s.symptoms.clone())
            .unwrap_or_default()
    }

    pub fn set_awaiting_confirmation(&self, session_id: &str, awaiting: bool) {
        if let Some(mut entry) = self.sessions.get_mut(session_id) {
            entry.awaiting_confirmation = awaiting;
        }
    }

    pub fn is_awaiting_confirmation(&self, session_id: &str) -> bool {
        self.sessions
            .get(session_id)
            .map(|s| s.awaiting_confirmation)
            .unwrap_or(false)
    }

    /// Ends a conversation, e.g. after a final diagnosis.
    pub fn clear(&self, session_id: &str) {
        self.sessions.remove(session_id);
    }

    /// Drops sessions idle longer than the TTL. Returns how many were
    /// removed, counted inside the sweep: request threads insert while
    /// `retain` walks the shards, so a before/after length diff is not a
    /// removal count.
    pub fn prune_idle(&self) -> usize {
        let now = Utc::now().timestamp_millis();
        let mut removed = 0;
        self.sessions.retain(|_, state| {
            let keep = now - state.last_seen_ms <= self.ttl_ms;
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    #[cfg(test)]
    fn backdate(&self, session_id: &str, ms: i64) {
        if let Some(mut entry) = self.sessions.get_mut(session_id) {
            entry.last_seen_ms -= ms;
        }
    }
}

/// Dialogflow sends the session as a full resource path
/// (`projects/<p>/agent/sessions/<id>`); only the last segment is the id.
pub fn session_id_from_path(session: &str) -> &str {
    session.rsplit('/').next().unwrap_or(session)
}
