/// Identifier of a user / session owner (e.g. `"u1"`, `"curator"`).
pub type UserId = String;

/// Identifier of a stored entity. Records and notifications use UUID v4 strings.
pub type EntityId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Generate a fresh entity identifier.
pub fn new_entity_id() -> EntityId {
    uuid::Uuid::new_v4().to_string()
}
