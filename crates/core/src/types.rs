/// All primary keys are database-generated UUIDs (never auto-incrementing).
pub type DbId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
