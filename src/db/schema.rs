//! Database schema and migrations for Cabinet.
//!
//! Migrations are applied in order; `schema_version` records which ones ran.
//!
//! Folder, file and favorite rows carry no `ON DELETE CASCADE`: removal of a
//! subtree is done by the explicit sweep in `file::tree`.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: users, groups and the capability tables read by the local directory
    r#"
CREATE TABLE users (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    email       TEXT NOT NULL UNIQUE,
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE groups (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE user_groups (
    user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    group_id    INTEGER NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
    PRIMARY KEY (user_id, group_id)
);

CREATE INDEX idx_user_groups_group_id ON user_groups(group_id);

CREATE TABLE user_permissions (
    user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    permission  TEXT NOT NULL,
    PRIMARY KEY (user_id, permission)
);
"#,
    // v2: folder tree and file entries
    r#"
CREATE TABLE folders (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    owner_id    INTEGER NOT NULL,
    parent_id   INTEGER REFERENCES folders(id),        -- NULL for root
    name        TEXT NOT NULL,
    group_id    INTEGER REFERENCES groups(id) ON DELETE SET NULL,
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_folders_owner_parent ON folders(owner_id, parent_id);
CREATE INDEX idx_folders_parent_id ON folders(parent_id);
CREATE INDEX idx_folders_group_id ON folders(group_id);

CREATE TABLE files (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    owner_id    INTEGER NOT NULL,
    folder_id   INTEGER REFERENCES folders(id),        -- NULL for root
    name        TEXT NOT NULL,
    stored_name TEXT NOT NULL,
    size        INTEGER NOT NULL DEFAULT 0 CHECK (size >= 0),
    group_id    INTEGER REFERENCES groups(id) ON DELETE SET NULL,
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_files_owner_folder ON files(owner_id, folder_id);
CREATE INDEX idx_files_folder_id ON files(folder_id);
CREATE INDEX idx_files_group_id ON files(group_id);
"#,
    // v3: per-viewer favorites
    r#"
CREATE TABLE favorites (
    user_id     INTEGER NOT NULL,
    entity_id   INTEGER NOT NULL,
    entity_type TEXT NOT NULL CHECK (entity_type IN ('file', 'folder')),
    created_at  TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (user_id, entity_id, entity_type)
);

CREATE INDEX idx_favorites_entity ON favorites(entity_type, entity_id);
"#,
];
