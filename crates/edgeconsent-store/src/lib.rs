//! Edge Consent Store — named key-value preference stores.
//!
//! The consent manager only needs to read, write and delete one string blob
//! under a fixed key, so persistence is expressed as the [`PreferenceStore`]
//! port with an in-memory and a SQLite implementation.

pub mod memory;
pub mod schema;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use edgeconsent_core::Result;

/// A named local key-value store holding string blobs.
pub trait PreferenceStore: Send + Sync {
    /// Name of the datastore this handle reads and writes.
    fn name(&self) -> &str;

    /// Read the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Insert or replace the value stored under `key`.
    fn put(&self, key: &str, value: &str) -> Result<()>;

    /// Delete `key`. Returns true if a value was removed.
    fn remove(&self, key: &str) -> Result<bool>;
}
