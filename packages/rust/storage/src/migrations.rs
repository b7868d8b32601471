//! SQL migration definitions for the Beacon corpus database.
//!
//! Migrations are applied in order on database open. Each one records its
//! version in `schema_migrations` so reopening an existing file is a no-op.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: collections, documents",
        sql: r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Named corpora; get-or-create on open
CREATE TABLE IF NOT EXISTS collections (
    name        TEXT PRIMARY KEY,
    description TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

-- Stored evidence. `url` is not unique; deduplication happens before insert.
CREATE TABLE IF NOT EXISTS documents (
    id              TEXT PRIMARY KEY,
    collection      TEXT NOT NULL REFERENCES collections(name) ON DELETE CASCADE,
    url             TEXT NOT NULL,
    text            TEXT NOT NULL,
    content_hash    TEXT NOT NULL,
    ingested_at     TEXT NOT NULL,
    embedding_model TEXT NOT NULL,
    embedding       BLOB NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection);
CREATE INDEX IF NOT EXISTS idx_documents_url ON documents(collection, url);

INSERT OR IGNORE INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
