//! Database schema SQL.

/// One row per (datastore, key). Values are opaque string blobs.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS preferences (
    datastore TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (datastore, key)
);
"#;
