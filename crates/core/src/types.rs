/// Batch identifiers are opaque strings (UUIDv7 when generated here).
pub type BatchId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Generate a fresh batch id.
///
/// UUIDv7 keeps ids unique and roughly time-ordered, which makes ledger
/// files sort by admission time on disk.
pub fn new_batch_id() -> BatchId {
    uuid::Uuid::now_v7().to_string()
}
