//! Authoritative mapping of non-terminal jobs.
//!
//! [`JobQueue`] is a pure container: a unique-key map plus operations.
//! Display order is computed on read, never stored.  Removing a job once it
//! reaches a terminal state is the orchestrator's responsibility.

use std::collections::HashMap;

use crate::job::Job;
use crate::types::JobId;

/// Bounded-by-usage map of job id to job snapshot.
#[derive(Debug, Clone, Default)]
pub struct JobQueue {
    jobs: HashMap<JobId, Job>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a single job snapshot.
    pub fn upsert(&mut self, job: Job) {
        self.jobs.insert(job.id.clone(), job);
    }

    /// Bulk overwrite-by-id, used for snapshot reconciliation.
    ///
    /// Only jobs present in the iterator are touched; ids absent from it
    /// are never deleted.
    pub fn upsert_many(&mut self, jobs: impl IntoIterator<Item = Job>) {
        for job in jobs {
            self.upsert(job);
        }
    }

    /// Remove a job by id, returning it if present.
    pub fn remove(&mut self, id: &str) -> Option<Job> {
        self.jobs.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&Job> {
        self.jobs.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.jobs.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Ids of all tracked jobs, in no particular order.
    pub fn ids(&self) -> Vec<JobId> {
        self.jobs.keys().cloned().collect()
    }

    /// Active-jobs queue view: ascending `created_at`, id as tie-break.
    pub fn display_order(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.jobs.values().cloned().collect();
        jobs.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        jobs
    }

    /// Alternate sorted view: descending progress, id as tie-break.
    pub fn by_progress(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.jobs.values().cloned().collect();
        jobs.sort_by(|a, b| {
            b.progress
                .cmp(&a.progress)
                .then_with(|| a.id.cmp(&b.id))
        });
        jobs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobStatus;
    use chrono::{TimeZone, Utc};

    fn job(id: &str, progress: u8, created_secs: i64) -> Job {
        Job {
            id: id.to_string(),
            status: JobStatus::Queued,
            progress,
            created_at: Utc.timestamp_opt(created_secs, 0).unwrap(),
            prompt: String::new(),
        }
    }

    #[test]
    fn upsert_replaces_by_id() {
        let mut queue = JobQueue::new();
        queue.upsert(job("j1", 10, 0));
        queue.upsert(job("j1", 40, 0));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.get("j1").unwrap().progress, 40);
    }

    #[test]
    fn upsert_many_never_deletes_absent_ids() {
        let mut queue = JobQueue::new();
        queue.upsert(job("j1", 0, 0));
        queue.upsert(job("j2", 0, 1));
        queue.upsert_many(vec![job("j2", 50, 1), job("j3", 0, 2)]);
        assert_eq!(queue.len(), 3);
        assert!(queue.contains("j1"));
        assert_eq!(queue.get("j2").unwrap().progress, 50);
    }

    #[test]
    fn display_order_ascending_created_at() {
        let mut queue = JobQueue::new();
        queue.upsert(job("j2", 0, 20));
        queue.upsert(job("j1", 0, 10));
        queue.upsert(job("j3", 0, 30));
        let ids: Vec<String> = queue.display_order().into_iter().map(|j| j.id).collect();
        assert_eq!(ids, vec!["j1", "j2", "j3"]);
    }

    #[test]
    fn display_order_ties_break_on_id() {
        let mut queue = JobQueue::new();
        queue.upsert(job("b", 0, 10));
        queue.upsert(job("a", 0, 10));
        let ids: Vec<String> = queue.display_order().into_iter().map(|j| j.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn by_progress_descending() {
        let mut queue = JobQueue::new();
        queue.upsert(job("j1", 10, 0));
        queue.upsert(job("j2", 90, 1));
        queue.upsert(job("j3", 50, 2));
        let ids: Vec<String> = queue.by_progress().into_iter().map(|j| j.id).collect();
        assert_eq!(ids, vec!["j2", "j3", "j1"]);
    }

    #[test]
    fn remove_returns_the_job() {
        let mut queue = JobQueue::new();
        queue.upsert(job("j1", 0, 0));
        assert!(queue.remove("j1").is_some());
        assert!(queue.remove("j1").is_none());
        assert!(queue.is_empty());
    }
}
