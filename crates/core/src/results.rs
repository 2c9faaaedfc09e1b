//! Bounded, ordered history of completed generations.
//!
//! [`ResultHistory`] keeps the newest results first, deduplicated by id and
//! truncated to a fixed capacity.  Entries are replaced wholesale when a
//! fresher copy with the same id arrives, never merged field-by-field.

use serde::{Deserialize, Serialize};

use crate::params::GenerationParams;
use crate::types::{JobId, Timestamp};

/// Default bound on the number of retained results.
pub const DEFAULT_RESULT_CAPACITY: usize = 20;

/// A completed generation's display record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    pub id: String,
    /// Back-reference to the job that produced this result.
    pub job_id: JobId,
    #[serde(default)]
    pub prompt: String,
    /// Reference to the generated image (URL or backend path).
    #[serde(default)]
    pub image_url: String,
    /// Defaulted to "now" when the payload omits it; display ordering
    /// depends on this field being present.
    #[serde(default = "default_created_at")]
    pub created_at: Timestamp,
    #[serde(default)]
    pub params: GenerationParams,
}

fn default_created_at() -> Timestamp {
    chrono::Utc::now()
}

/// Newest-first bounded list of [`GenerationResult`]s.
#[derive(Debug, Clone)]
pub struct ResultHistory {
    entries: Vec<GenerationResult>,
    capacity: usize,
}

impl Default for ResultHistory {
    fn default() -> Self {
        Self::new(DEFAULT_RESULT_CAPACITY)
    }
}

impl ResultHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
        }
    }

    /// Prepend a result, replacing any existing entry with the same id,
    /// then truncate to capacity.
    pub fn add(&mut self, result: GenerationResult) {
        self.entries.retain(|r| r.id != result.id);
        self.entries.insert(0, result);
        self.entries.truncate(self.capacity);
    }

    /// Replace the whole list: sort newest-first, deduplicate by id
    /// (keeping the freshest copy), truncate to capacity.
    pub fn replace_all(&mut self, results: Vec<GenerationResult>) {
        let mut results = results;
        results.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut seen = std::collections::HashSet::new();
        results.retain(|r| seen.insert(r.id.clone()));
        results.truncate(self.capacity);

        self.entries = results;
    }

    /// Drop the entry with the given id, if present.
    pub fn remove(&mut self, id: &str) {
        self.entries.retain(|r| r.id != id);
    }

    /// Newest-first slice of retained results.
    pub fn entries(&self) -> &[GenerationResult] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn result(id: &str, created_secs: i64) -> GenerationResult {
        GenerationResult {
            id: id.to_string(),
            job_id: format!("job-{id}"),
            prompt: String::new(),
            image_url: String::new(),
            created_at: Utc.timestamp_opt(created_secs, 0).unwrap(),
            params: GenerationParams::default(),
        }
    }

    #[test]
    fn add_prepends_newest_first() {
        let mut history = ResultHistory::new(5);
        history.add(result("r1", 10));
        history.add(result("r2", 20));
        let ids: Vec<&str> = history.entries().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r2", "r1"]);
    }

    #[test]
    fn add_never_exceeds_capacity() {
        let mut history = ResultHistory::new(3);
        for i in 0..10 {
            history.add(result(&format!("r{i}"), i));
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.entries()[0].id, "r9");
    }

    #[test]
    fn add_replaces_same_id_wholesale() {
        let mut history = ResultHistory::new(5);
        history.add(result("r1", 10));
        let mut fresher = result("r1", 30);
        fresher.image_url = "updated.png".to_string();
        history.add(fresher);
        assert_eq!(history.len(), 1);
        assert_eq!(history.entries()[0].image_url, "updated.png");
    }

    #[test]
    fn replace_all_sorts_newest_first_and_truncates() {
        let mut history = ResultHistory::new(2);
        history.replace_all(vec![result("r1", 10), result("r3", 30), result("r2", 20)]);
        let ids: Vec<&str> = history.entries().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r3", "r2"]);
    }

    #[test]
    fn replace_all_dedupes_by_id_keeping_freshest() {
        let mut history = ResultHistory::new(5);
        history.replace_all(vec![result("r1", 10), result("r1", 40)]);
        assert_eq!(history.len(), 1);
        assert_eq!(
            history.entries()[0].created_at,
            Utc.timestamp_opt(40, 0).unwrap()
        );
    }

    #[test]
    fn remove_filters_by_id() {
        let mut history = ResultHistory::new(5);
        history.add(result("r1", 10));
        history.add(result("r2", 20));
        history.remove("r1");
        assert_eq!(history.len(), 1);
        assert_eq!(history.entries()[0].id, "r2");
    }

    #[test]
    fn missing_created_at_defaults_to_now() {
        let before = Utc::now();
        let parsed: GenerationResult =
            serde_json::from_str(r#"{"id":"r1","job_id":"j1"}"#).unwrap();
        assert!(parsed.created_at >= before);
        assert!(parsed.created_at <= Utc::now());
    }
}
