// SPDX-License-Identifier: MIT OR Apache-2.0
//! Schema DDL, applied idempotently at startup.
//!
//! FTS index maintenance (insert/update/delete) happens via triggers rather
//! than application code, so a row can never drift out of sync with the
//! index regardless of which code path wrote it.

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS profiles (
    id       TEXT PRIMARY KEY,
    username TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS organizations (
    id        TEXT PRIMARY KEY,
    namespace TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS org_members (
    org_id     TEXT NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    profile_id TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    role       TEXT NOT NULL,
    PRIMARY KEY (org_id, profile_id)
);

CREATE TABLE IF NOT EXISTS tools (
    id               TEXT PRIMARY KEY,
    name             TEXT NOT NULL UNIQUE,
    short_name       TEXT,
    description      TEXT,
    tags             TEXT NOT NULL DEFAULT '',
    visibility       TEXT NOT NULL DEFAULT 'public',
    owner_profile_id TEXT REFERENCES profiles(id),
    owner_org_id     TEXT REFERENCES organizations(id),
    total_downloads  INTEGER NOT NULL DEFAULT 0,
    created_at       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tool_versions (
    tool_id       TEXT NOT NULL REFERENCES tools(id) ON DELETE CASCADE,
    version       TEXT NOT NULL,
    raw_manifest  BLOB NOT NULL,
    bundle_hash   TEXT NOT NULL,
    bundle_size   INTEGER NOT NULL,
    bundle_path   TEXT NOT NULL,
    downloads     INTEGER NOT NULL DEFAULT 0,
    yanked        INTEGER NOT NULL DEFAULT 0,
    yank_reason   TEXT,
    replacement   TEXT,
    published_by  TEXT NOT NULL,
    published_at  TEXT NOT NULL,
    PRIMARY KEY (tool_id, version)
);

CREATE TABLE IF NOT EXISTS attestations (
    id                   TEXT PRIMARY KEY,
    tool_id              TEXT NOT NULL,
    version              TEXT NOT NULL,
    auditor              TEXT NOT NULL,
    auditor_provider     TEXT NOT NULL,
    role                 TEXT NOT NULL,
    bundle               TEXT NOT NULL,
    rekor_log_id         TEXT,
    rekor_log_index      INTEGER,
    signed_at            TEXT NOT NULL,
    verified             INTEGER NOT NULL,
    rekor_verified       INTEGER NOT NULL,
    certificate_verified INTEGER NOT NULL,
    signature_verified   INTEGER NOT NULL,
    verified_at          TEXT,
    revoked              INTEGER NOT NULL DEFAULT 0,
    FOREIGN KEY (tool_id, version) REFERENCES tool_versions(tool_id, version) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS download_logs (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    tool_id       TEXT NOT NULL,
    version       TEXT NOT NULL,
    downloaded_at TEXT NOT NULL,
    FOREIGN KEY (tool_id, version) REFERENCES tool_versions(tool_id, version) ON DELETE CASCADE
);

CREATE VIRTUAL TABLE IF NOT EXISTS tools_fts USING fts5(
    name, short_name, description, tags,
    content = 'tools', content_rowid = 'rowid'
);

CREATE TRIGGER IF NOT EXISTS tools_ai AFTER INSERT ON tools BEGIN
    INSERT INTO tools_fts(rowid, name, short_name, description, tags)
    VALUES (new.rowid, new.name, new.short_name, new.description, new.tags);
END;

CREATE TRIGGER IF NOT EXISTS tools_ad AFTER DELETE ON tools BEGIN
    INSERT INTO tools_fts(tools_fts, rowid, name, short_name, description, tags)
    VALUES ('delete', old.rowid, old.name, old.short_name, old.description, old.tags);
END;

CREATE TRIGGER IF NOT EXISTS tools_au AFTER UPDATE ON tools BEGIN
    INSERT INTO tools_fts(tools_fts, rowid, name, short_name, description, tags)
    VALUES ('delete', old.rowid, old.name, old.short_name, old.description, old.tags);
    INSERT INTO tools_fts(rowid, name, short_name, description, tags)
    VALUES (new.rowid, new.name, new.short_name, new.description, new.tags);
END;
"#;
