use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ResultEntry {
    pub text: String,
    pub recorded_at: DateTime<Utc>,
}

/// In-memory store of completed detection results, keyed by the id handed
/// back to the client. Report retrieval reads through the same key, so
/// concurrent uploads never see each other's text.
#[derive(Clone)]
pub struct ReportStore {
    entries: Arc<Mutex<HashMap<Uuid, ResultEntry>>>,
}

impl ReportStore {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn record(&self, text: String) -> Uuid {
        let id = Uuid::new_v4();
        let entry = ResultEntry {
            text,
            recorded_at: Utc::now(),
        };
        log::debug!("recording result {} at {}", id, entry.recorded_at);
        self.entries.lock().unwrap().insert(id, entry);
        id
    }

    pub fn get(&self, id: Uuid) -> Option<ResultEntry> {
        self.entries.lock().unwrap().get(&id).cloned()
    }
}

impl Default for ReportStore {
    fn default() -> Self {
        Self::new()
    }
}
