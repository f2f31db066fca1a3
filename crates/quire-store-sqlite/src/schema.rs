//! SQL schema for the Quire SQLite store.
//!
//! Executed on every connection open. `foreign_keys` is a per-connection
//! pragma, so it must run each time; the DDL is idempotent.

/// Full schema DDL.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id     TEXT PRIMARY KEY,
    username    TEXT NOT NULL UNIQUE,
    display     TEXT,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS collections (
    collection_id TEXT PRIMARY KEY,
    title         TEXT,
    description   TEXT,
    summary       TEXT
);

CREATE TABLE IF NOT EXISTS collection_permissions (
    permission_id TEXT PRIMARY KEY,
    collection_id TEXT NOT NULL REFERENCES collections(collection_id),
    user_id       TEXT NOT NULL REFERENCES users(user_id),
    level         TEXT NOT NULL CHECK (level IN ('READ', 'EDIT', 'OWNER')),
    UNIQUE (collection_id, user_id)
);

-- Audit tables are append-only. Rows are deleted only together with their
-- collection.
CREATE TABLE IF NOT EXISTS collection_audits (
    audit_id      TEXT PRIMARY KEY,
    collection_id TEXT NOT NULL REFERENCES collections(collection_id),
    performed_by  TEXT REFERENCES users(user_id),
    performed_at  TEXT NOT NULL,
    action        TEXT NOT NULL CHECK (action IN ('CREATE', 'UPDATE', 'DELETE', 'ARCHIVE'))
);

-- permission_id has no foreign key: the audit of a revoke
-- outlives the permission row it describes.
CREATE TABLE IF NOT EXISTS permission_audits (
    audit_id      TEXT PRIMARY KEY,
    permission_id TEXT NOT NULL,
    collection_id TEXT NOT NULL REFERENCES collections(collection_id),
    user_id       TEXT NOT NULL,
    performed_by  TEXT NOT NULL REFERENCES users(user_id),
    performed_at  TEXT NOT NULL,
    old_level     TEXT CHECK (old_level IN ('READ', 'EDIT', 'OWNER')),
    new_level     TEXT CHECK (new_level IN ('READ', 'EDIT', 'OWNER')),
    CHECK (old_level IS NOT NULL OR new_level IS NOT NULL)
);

CREATE TABLE IF NOT EXISTS documents (
    document_id   TEXT PRIMARY KEY,
    collection_id TEXT REFERENCES collections(collection_id),
    created_by    TEXT REFERENCES users(user_id),
    title         TEXT,
    description   TEXT,
    summary       TEXT,
    created_at    TEXT NOT NULL
);

-- No foreign key on document_id: the DELETE audit outlives the document.
CREATE TABLE IF NOT EXISTS document_audits (
    audit_id      TEXT PRIMARY KEY,
    document_id   TEXT NOT NULL,
    collection_id TEXT,
    performed_by  TEXT REFERENCES users(user_id),
    performed_at  TEXT NOT NULL,
    action        TEXT NOT NULL CHECK (action IN ('CREATE', 'UPDATE', 'DELETE')),
    old_values    TEXT,   -- JSON snapshot or NULL
    new_values    TEXT    -- JSON snapshot or NULL
);

CREATE TABLE IF NOT EXISTS tags (
    tag_id        TEXT PRIMARY KEY,
    collection_id TEXT NOT NULL REFERENCES collections(collection_id),
    title         TEXT NOT NULL CHECK (length(trim(title)) > 0),
    color         TEXT NOT NULL,
    UNIQUE (collection_id, title)
);

CREATE TABLE IF NOT EXISTS document_tags (
    document_id TEXT NOT NULL REFERENCES documents(document_id),
    tag_id      TEXT NOT NULL REFERENCES tags(tag_id),
    PRIMARY KEY (document_id, tag_id)
);

CREATE INDEX IF NOT EXISTS permissions_user_idx          ON collection_permissions(user_id);
CREATE INDEX IF NOT EXISTS collection_audits_coll_idx    ON collection_audits(collection_id);
CREATE INDEX IF NOT EXISTS permission_audits_coll_idx    ON permission_audits(collection_id);
CREATE INDEX IF NOT EXISTS document_audits_doc_idx       ON document_audits(document_id);
CREATE INDEX IF NOT EXISTS document_audits_coll_idx      ON document_audits(collection_id);
CREATE INDEX IF NOT EXISTS documents_collection_idx      ON documents(collection_id);
CREATE INDEX IF NOT EXISTS document_tags_tag_idx         ON document_tags(tag_id);

PRAGMA user_version = 1;
";
