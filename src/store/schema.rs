// SPDX-License-Identifier: MPL-2.0

/// SQL schema for the pagectx database
pub const SCHEMA: &str = r#"
-- Database version for migrations
PRAGMA user_version = 1;
PRAGMA foreign_keys = ON;

-- sessions: one per username, holding the primary credential
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    primary_credential TEXT NOT NULL,
    created_at TEXT NOT NULL,
    last_accessed_at TEXT NOT NULL,
    expires_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_sessions_primary ON sessions(primary_credential);

-- delegated_credentials: per-resource tokens, one row per (session, resource)
CREATE TABLE IF NOT EXISTS delegated_credentials (
    session_id TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
    resource_id TEXT NOT NULL,
    credential TEXT NOT NULL,
    recorded_at TEXT NOT NULL,
    PRIMARY KEY (session_id, resource_id)
);

-- contexts: derived page summaries; (resource_id, username) uniqueness is
-- enforced by ContextStore::upsert, not by a constraint
CREATE TABLE IF NOT EXISTS contexts (
    id TEXT PRIMARY KEY,
    resource_id TEXT NOT NULL,
    resource_name TEXT NOT NULL,
    username TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT,
    post_ids_json TEXT NOT NULL,
    posts_count INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_contexts_resource ON contexts(resource_id, username);
CREATE INDEX IF NOT EXISTS idx_contexts_username ON contexts(username, created_at DESC);
"#;
