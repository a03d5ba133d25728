pub mod path;
mod push_id;
mod schema;
mod sqlite;

pub use push_id::PushIdGenerator;
pub use sqlite::SqliteStore;

use chrono::Utc;
use serde_json::{Map, Value, json};

use crate::error::Result;

/// Store is a slash-path addressed JSON tree, modelled after a realtime
/// database: objects nest, everything else is a leaf, and writing `null` or
/// an empty object removes the node.
///
/// Writes resolve [`server_timestamp`] placeholders to the store's clock.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    /// Returns true once the schema has been created.
    fn is_initialized(&self) -> Result<bool>;

    /// Reads the subtree at `path`, or `None` if nothing is stored there.
    fn get(&self, path: &str) -> Result<Option<Value>>;

    /// Replaces the subtree at `path` with `value`.
    fn set(&self, path: &str, value: &Value) -> Result<()>;

    /// Merges `fields` into the node at `path`. Keys may be relative paths
    /// (`"profile/name"`); untouched siblings are kept.
    fn update(&self, path: &str, fields: &Map<String, Value>) -> Result<()>;

    /// Like [`Store::update`], but only if something is stored at `path`.
    /// The check and the write happen in one transaction. Returns false
    /// and writes nothing when the node is absent.
    fn update_if_exists(&self, path: &str, fields: &Map<String, Value>) -> Result<bool>;

    /// Removes the subtree at `path`. Returns false if it was already absent.
    fn remove(&self, path: &str) -> Result<bool>;

    /// Appends `value` under `path` with a generated, time-ordered key.
    fn push(&self, path: &str, value: &Value) -> Result<String>;

    /// Pushes under `path` only while `guard` exists, atomically. Returns
    /// `None` and writes nothing when `guard` is absent.
    fn push_if_exists(&self, guard: &str, path: &str, value: &Value) -> Result<Option<String>>;

    /// Writes `value` only if nothing exists at `path`, atomically.
    /// Returns false when the path was already taken.
    fn insert_if_absent(&self, path: &str, value: &Value) -> Result<bool>;

    fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.get(path)?.is_some())
    }

    /// Direct children of `path` in key order. Push keys sort by creation
    /// time, so pushed collections come back oldest first.
    fn children(&self, path: &str) -> Result<Vec<(String, Value)>> {
        match self.get(path)? {
            Some(Value::Object(map)) => Ok(map.into_iter().collect()),
            _ => Ok(Vec::new()),
        }
    }
}

const SERVER_VALUE_KEY: &str = ".sv";

/// Placeholder replaced by the store with the current time in epoch millis.
#[must_use]
pub fn server_timestamp() -> Value {
    json!({ SERVER_VALUE_KEY: "timestamp" })
}

pub(crate) fn resolve_server_values(value: &Value, now_ms: i64) -> Value {
    match value {
        Value::Object(map) => {
            if map.len() == 1
                && map.get(SERVER_VALUE_KEY).and_then(Value::as_str) == Some("timestamp")
            {
                return Value::from(now_ms);
            }
            Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), resolve_server_values(v, now_ms)))
                    .collect(),
            )
        }
        other => other.clone(),
    }
}

pub(crate) fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
