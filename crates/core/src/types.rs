/// Every batch is identified by a random UUID (v4).
pub type BatchId = uuid::Uuid;

/// Target ids are opaque strings chosen by the host, unique within a batch.
pub type TargetId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
