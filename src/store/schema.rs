pub const SCHEMA: &str = r#"
-- Store metadata
CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- The JSON tree, flattened to one row per leaf.
-- Objects are implied by their children; scalars and arrays are leaves.
CREATE TABLE IF NOT EXISTS nodes (
    path TEXT PRIMARY KEY,        -- normalized, e.g. users/alice/posts/-Nx.../title
    value TEXT NOT NULL,          -- JSON encoded leaf
    updated_at TEXT DEFAULT (datetime('now'))
);

INSERT OR IGNORE INTO meta (key, value) VALUES ('schema_version', '1');
"#;
