use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::{Map, Value};

use super::path::{child, normalize_path, validate_segment};
use super::schema::SCHEMA;
use super::{PushIdGenerator, Store, now_millis, resolve_server_values};
use crate::error::{Error, Result};

pub struct SqliteStore {
    conn: Mutex<Connection>,
    push_ids: PushIdGenerator,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
            push_ids: PushIdGenerator::new(),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
            push_ids: PushIdGenerator::new(),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

/// Bounds of the key range holding every descendant of `path`.
/// '0' is the character right after '/', so `[path/, path0)` is exactly
/// the set of keys prefixed with `path/`.
fn subtree_bounds(path: &str) -> (String, String) {
    (format!("{path}/"), format!("{path}0"))
}

fn flatten(value: &Value, prefix: &str, out: &mut Vec<(String, Value)>) -> Result<()> {
    match value {
        Value::Null => {}
        Value::Object(map) => {
            for (key, child_value) in map {
                validate_segment(key)?;
                flatten(child_value, &format!("{prefix}/{key}"), out)?;
            }
        }
        leaf => out.push((prefix.to_string(), leaf.clone())),
    }
    Ok(())
}

fn insert_at(node: &mut Value, segments: &[&str], leaf: Value) {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        match segments {
            [] => {}
            [last] => {
                map.insert((*last).to_string(), leaf);
            }
            [first, rest @ ..] => {
                let next = map
                    .entry((*first).to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                insert_at(next, rest, leaf);
            }
        }
    }
}

fn read_subtree(conn: &Connection, path: &str) -> Result<Option<Value>> {
    let (lower, upper) = subtree_bounds(path);
    let mut stmt = conn.prepare(
        "SELECT path, value FROM nodes
         WHERE path = ?1 OR (path >= ?2 AND path < ?3)
         ORDER BY path",
    )?;

    let rows = stmt.query_map(params![path, lower, upper], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut root: Option<Value> = None;
    for row in rows {
        let (node_path, raw) = row?;
        let leaf: Value = serde_json::from_str(&raw).map_err(|e| {
            tracing::error!("Invalid JSON stored at '{}': {}", node_path, e);
            Error::from(e)
        })?;

        if node_path == path {
            return Ok(Some(leaf));
        }

        let relative: Vec<&str> = node_path[lower.len()..].split('/').collect();
        insert_at(
            root.get_or_insert_with(|| Value::Object(Map::new())),
            &relative,
            leaf,
        );
    }

    Ok(root)
}

fn subtree_exists(conn: &Connection, path: &str) -> Result<bool> {
    let (lower, upper) = subtree_bounds(path);
    let found = conn
        .query_row(
            "SELECT 1 FROM nodes WHERE path = ?1 OR (path >= ?2 AND path < ?3) LIMIT 1",
            params![path, lower, upper],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

fn delete_subtree(conn: &Connection, path: &str) -> Result<usize> {
    let (lower, upper) = subtree_bounds(path);
    let rows = conn.execute(
        "DELETE FROM nodes WHERE path = ?1 OR (path >= ?2 AND path < ?3)",
        params![path, lower, upper],
    )?;
    Ok(rows)
}

/// Replaces the subtree at `path`. A leaf stored at an ancestor would shadow
/// the new children, so ancestors are cleared too.
fn write_subtree(conn: &Connection, path: &str, value: &Value) -> Result<()> {
    let mut leaves = Vec::new();
    flatten(value, path, &mut leaves)?;

    delete_subtree(conn, path)?;

    let mut ancestor = path;
    while let Some((parent, _)) = ancestor.rsplit_once('/') {
        conn.execute("DELETE FROM nodes WHERE path = ?1", params![parent])?;
        ancestor = parent;
    }

    let now = format_datetime(&Utc::now());
    let mut stmt =
        conn.prepare("INSERT INTO nodes (path, value, updated_at) VALUES (?1, ?2, ?3)")?;
    for (leaf_path, leaf) in leaves {
        stmt.execute(params![leaf_path, serde_json::to_string(&leaf)?, now])?;
    }

    Ok(())
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    fn is_initialized(&self) -> Result<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'nodes'",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn get(&self, path: &str) -> Result<Option<Value>> {
        let path = normalize_path(path)?;
        read_subtree(&self.conn(), &path)
    }

    fn set(&self, path: &str, value: &Value) -> Result<()> {
        let path = normalize_path(path)?;
        let value = resolve_server_values(value, now_millis());

        let mut conn = self.conn();
        let tx = conn.transaction()?;
        write_subtree(&tx, &path, &value)?;
        tx.commit()?;
        Ok(())
    }

    fn update(&self, path: &str, fields: &Map<String, Value>) -> Result<()> {
        let path = normalize_path(path)?;
        let now = now_millis();

        let mut conn = self.conn();
        let tx = conn.transaction()?;
        for (key, value) in fields {
            let target = normalize_path(&format!("{path}/{key}"))?;
            write_subtree(&tx, &target, &resolve_server_values(value, now))?;
        }
        tx.commit()?;
        Ok(())
    }

    fn update_if_exists(&self, path: &str, fields: &Map<String, Value>) -> Result<bool> {
        let path = normalize_path(path)?;
        let now = now_millis();

        let mut conn = self.conn();
        let tx = conn.transaction()?;
        if !subtree_exists(&tx, &path)? {
            return Ok(false);
        }
        for (key, value) in fields {
            let target = normalize_path(&format!("{path}/{key}"))?;
            write_subtree(&tx, &target, &resolve_server_values(value, now))?;
        }
        tx.commit()?;
        Ok(true)
    }

    fn remove(&self, path: &str) -> Result<bool> {
        let path = normalize_path(path)?;
        let rows = delete_subtree(&self.conn(), &path)?;
        Ok(rows > 0)
    }

    fn push(&self, path: &str, value: &Value) -> Result<String> {
        let path = normalize_path(path)?;
        let now = now_millis();
        let key = self.push_ids.generate(now);
        let target = child(&path, &key)?;

        let mut conn = self.conn();
        let tx = conn.transaction()?;
        write_subtree(&tx, &target, &resolve_server_values(value, now))?;
        tx.commit()?;
        Ok(key)
    }

    fn push_if_exists(&self, guard: &str, path: &str, value: &Value) -> Result<Option<String>> {
        let guard = normalize_path(guard)?;
        let path = normalize_path(path)?;
        let now = now_millis();

        let mut conn = self.conn();
        let tx = conn.transaction()?;
        if !subtree_exists(&tx, &guard)? {
            return Ok(None);
        }
        let key = self.push_ids.generate(now);
        let target = child(&path, &key)?;
        write_subtree(&tx, &target, &resolve_server_values(value, now))?;
        tx.commit()?;
        Ok(Some(key))
    }

    fn insert_if_absent(&self, path: &str, value: &Value) -> Result<bool> {
        let path = normalize_path(path)?;
        let value = resolve_server_values(value, now_millis());

        let mut leaves = Vec::new();
        flatten(&value, &path, &mut leaves)?;
        if leaves.is_empty() {
            return Err(Error::invalid("Cannot reserve a path with an empty value"));
        }

        let mut conn = self.conn();
        let tx = conn.transaction()?;
        if subtree_exists(&tx, &path)? {
            return Ok(false);
        }
        write_subtree(&tx, &path, &value)?;
        tx.commit()?;
        Ok(true)
    }

    fn exists(&self, path: &str) -> Result<bool> {
        let path = normalize_path(path)?;
        subtree_exists(&self.conn(), &path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    use crate::store::server_timestamp;

    fn test_store(temp: &TempDir) -> SqliteStore {
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        store
    }

    #[test]
    fn test_initialize_creates_tables() {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        assert!(!store.is_initialized().unwrap());

        store.initialize().unwrap();
        assert!(store.is_initialized().unwrap());

        let conn = store.conn();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"meta".to_string()));
        assert!(tables.contains(&"nodes".to_string()));
    }

    #[test]
    fn test_set_and_get_subtree() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);

        let user = json!({
            "username": "alice",
            "resume": "# Hi",
            "profile": { "links": ["a", "b"], "visible": true }
        });
        store.set("users/alice", &user).unwrap();

        assert_eq!(store.get("users/alice").unwrap().unwrap(), user);
        assert_eq!(
            store.get("users/alice/username").unwrap().unwrap(),
            json!("alice")
        );
        assert_eq!(
            store.get("users/alice/profile/links").unwrap().unwrap(),
            json!(["a", "b"])
        );
        assert!(store.get("users/bob").unwrap().is_none());
    }

    #[test]
    fn test_set_replaces_previous_subtree() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);

        store
            .set("users/alice", &json!({ "a": 1, "b": 2 }))
            .unwrap();
        store.set("users/alice", &json!({ "c": 3 })).unwrap();

        assert_eq!(store.get("users/alice").unwrap().unwrap(), json!({ "c": 3 }));
    }

    #[test]
    fn test_prefix_siblings_are_not_descendants() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);

        store.set("users/al", &json!({ "n": 1 })).unwrap();
        store.set("users/alice", &json!({ "n": 2 })).unwrap();
        store.set("users/al-b", &json!({ "n": 3 })).unwrap();

        assert_eq!(store.get("users/al").unwrap().unwrap(), json!({ "n": 1 }));
        assert!(store.remove("users/al").unwrap());
        assert_eq!(store.get("users/alice/n").unwrap().unwrap(), json!(2));
        assert_eq!(store.get("users/al-b/n").unwrap().unwrap(), json!(3));
    }

    #[test]
    fn test_update_merges_fields() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);

        store
            .set("posts/p1", &json!({ "title": "old", "content": "body" }))
            .unwrap();

        let mut fields = Map::new();
        fields.insert("title".into(), json!("new"));
        fields.insert("meta/edited".into(), json!(true));
        store.update("posts/p1", &fields).unwrap();

        assert_eq!(
            store.get("posts/p1").unwrap().unwrap(),
            json!({ "title": "new", "content": "body", "meta": { "edited": true } })
        );
    }

    #[test]
    fn test_null_and_empty_object_remove() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);

        store.set("a/b", &json!({ "c": 1 })).unwrap();
        store.set("a/b", &Value::Null).unwrap();
        assert!(store.get("a/b").unwrap().is_none());

        store.set("a/b", &json!({ "c": 1 })).unwrap();
        store.set("a/b", &json!({})).unwrap();
        assert!(!store.exists("a/b").unwrap());
    }

    #[test]
    fn test_writing_below_a_leaf_replaces_it() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);

        store.set("a", &json!("leaf")).unwrap();
        store.set("a/b", &json!(1)).unwrap();
        assert_eq!(store.get("a").unwrap().unwrap(), json!({ "b": 1 }));
    }

    #[test]
    fn test_push_generates_ordered_keys() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);

        let first = store.push("items", &json!({ "n": 1 })).unwrap();
        let second = store.push("items", &json!({ "n": 2 })).unwrap();
        let third = store.push("items", &json!({ "n": 3 })).unwrap();

        let keys: Vec<String> = store
            .children("items")
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec![first, second, third]);
    }

    #[test]
    fn test_push_resolves_server_timestamp() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);

        let before = Utc::now().timestamp_millis();
        let key = store
            .push("items", &json!({ "createdAt": server_timestamp() }))
            .unwrap();
        let stored = store.get(&format!("items/{key}/createdAt")).unwrap().unwrap();

        assert!(stored.as_i64().unwrap() >= before);
    }

    #[test]
    fn test_insert_if_absent() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);

        assert!(
            store
                .insert_if_absent("users/alice", &json!({ "userId": "u1" }))
                .unwrap()
        );
        assert!(
            !store
                .insert_if_absent("users/alice", &json!({ "userId": "u2" }))
                .unwrap()
        );
        assert_eq!(
            store.get("users/alice/userId").unwrap().unwrap(),
            json!("u1")
        );
        assert!(store.insert_if_absent("users/bob", &json!({})).is_err());
    }

    #[test]
    fn test_update_if_exists_skips_removed_node() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);

        store
            .set("users/alice/posts/p1", &json!({ "title": "a", "authorId": "u1" }))
            .unwrap();
        let mut fields = Map::new();
        fields.insert("title".into(), json!("b"));
        assert!(store.update_if_exists("users/alice/posts/p1", &fields).unwrap());
        assert_eq!(
            store.get("users/alice/posts/p1/title").unwrap().unwrap(),
            json!("b")
        );

        store.remove("users/alice/posts/p1").unwrap();
        assert!(!store.update_if_exists("users/alice/posts/p1", &fields).unwrap());
        assert!(store.get("users/alice/posts/p1").unwrap().is_none());
    }

    #[test]
    fn test_push_if_exists_requires_guard() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);

        let comment = json!({ "content": "hi" });
        assert!(
            store
                .push_if_exists("users/alice/posts/p1", "users/alice/posts/p1/comments", &comment)
                .unwrap()
                .is_none()
        );
        assert!(store.get("users/alice/posts/p1").unwrap().is_none());

        store
            .set("users/alice/posts/p1", &json!({ "title": "a" }))
            .unwrap();
        let key = store
            .push_if_exists("users/alice/posts/p1", "users/alice/posts/p1/comments", &comment)
            .unwrap()
            .unwrap();
        assert_eq!(
            store
                .get(&format!("users/alice/posts/p1/comments/{key}/content"))
                .unwrap()
                .unwrap(),
            json!("hi")
        );
    }

    #[test]
    fn test_remove_missing_returns_false() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);
        assert!(!store.remove("nothing/here").unwrap());
    }

    #[test]
    fn test_invalid_keys_rejected() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);

        assert!(store.set("users/a.b", &json!(1)).is_err());
        assert!(store.set("users/alice", &json!({ "bad.key": 1 })).is_err());
        assert!(store.get("").is_err());
    }
}
