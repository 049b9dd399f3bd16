//! SQL schema for the search index database.

pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per indexed dataset. `dict_json` is returned verbatim in results.
CREATE TABLE IF NOT EXISTS documents (
    dataset_id        TEXT PRIMARY KEY,
    name              TEXT NOT NULL,
    title             TEXT NOT NULL,
    private           INTEGER NOT NULL,
    state             TEXT NOT NULL,
    metadata_modified TEXT NOT NULL,
    content_hash      TEXT NOT NULL,
    dict_json         TEXT NOT NULL
);

-- Permission labels; a document is visible to an actor holding any of them.
CREATE TABLE IF NOT EXISTS document_labels (
    dataset_id TEXT NOT NULL REFERENCES documents(dataset_id) ON DELETE CASCADE,
    label      TEXT NOT NULL,
    PRIMARY KEY (dataset_id, label)
);

CREATE INDEX IF NOT EXISTS document_labels_label_idx ON document_labels(label);

CREATE TABLE IF NOT EXISTS document_facets (
    dataset_id TEXT NOT NULL REFERENCES documents(dataset_id) ON DELETE CASCADE,
    field      TEXT NOT NULL,   -- 'tags' | 'organization' | 'res_format'
    value      TEXT NOT NULL,
    PRIMARY KEY (dataset_id, field, value)
);

CREATE INDEX IF NOT EXISTS document_facets_value_idx
    ON document_facets(field, value);

CREATE VIRTUAL TABLE IF NOT EXISTS documents_fts USING fts5(
    dataset_id UNINDEXED,
    name,
    title,
    notes,
    tags,
    res_text,
    res_format,
    organization
);

PRAGMA user_version = 1;
";
