//! In-memory task history: one entry per processed request, oldest first.

use crate::agent::types::ExecutionResult;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub task: String,
    pub result: ExecutionResult,
    /// Unix seconds
    pub timestamp: f64,
    /// "completed" or "error"
    pub status: String,
}

#[derive(Clone)]
pub struct HistoryStore {
    buffer: Arc<Mutex<VecDeque<HistoryEntry>>>,
    max_entries: usize,
}

impl HistoryStore {
    /// `max_entries == 0` keeps every entry
    pub fn new(max_entries: usize) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(VecDeque::new())),
            max_entries,
        }
    }

    pub fn add(&self, task: &str, result: &ExecutionResult) {
        let entry = HistoryEntry {
            task: task.to_string(),
            result: result.clone(),
            timestamp: unix_seconds(),
            status: result.status.as_str().to_string(),
        };

        let mut buf = self.buffer.lock();
        if self.max_entries > 0 && buf.len() >= self.max_entries {
            buf.pop_front();
        }
        buf.push_back(entry);
    }

    /// Last `count` entries, oldest of the window first
    pub fn recent(&self, count: usize) -> Vec<HistoryEntry> {
        let buf = self.buffer.lock();
        let skip = buf.len().saturating_sub(count);
        buf.iter().skip(skip).cloned().collect()
    }

    pub fn clear(&self) {
        self.buffer.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.lock().is_empty()
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(crate::config::schema::HistoryConfig::default().max_entries)
    }
}

fn unix_seconds() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed(data: &str) -> ExecutionResult {
        ExecutionResult::completed(vec![data.to_string()], vec![])
    }

    #[test]
    fn test_add_records_status_and_timestamp() {
        let store = HistoryStore::new(0);
        store.add("go to example.com", &completed("Example Domain"));
        store.add("", &ExecutionResult::error("Task request is empty"));

        let entries = store.recent(10);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].status, "completed");
        assert_eq!(entries[1].status, "error");
        assert!(entries[0].timestamp > 0.0);
        assert!(entries[0].timestamp <= entries[1].timestamp);
    }

    #[test]
    fn test_recent_returns_tail_in_order() {
        let store = HistoryStore::new(0);
        for i in 0..5 {
            store.add(&format!("task {}", i), &completed("x"));
        }

        let tasks: Vec<String> = store.recent(2).into_iter().map(|e| e.task).collect();
        assert_eq!(tasks, vec!["task 3", "task 4"]);

        assert_eq!(store.recent(50).len(), 5);
        assert!(store.recent(0).is_empty());
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let store = HistoryStore::new(3);
        for i in 0..5 {
            store.add(&format!("task {}", i), &completed("x"));
        }

        assert_eq!(store.len(), 3);
        assert_eq!(store.recent(10)[0].task, "task 2");
    }

    #[test]
    fn test_clear() {
        let store = HistoryStore::new(0);
        store.add("a", &completed("x"));
        assert!(!store.is_empty());

        store.clear();
        assert!(store.is_empty());
        assert!(store.recent(5).is_empty());
    }
}
