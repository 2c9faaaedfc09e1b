/// Jobs and results are keyed by backend-assigned string identifiers.
pub type JobId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
