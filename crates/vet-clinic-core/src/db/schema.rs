//! SQLite schema definition.

/// Schema for the embedded document store.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Documents (one JSON object body per document, grouped by collection)
-- ============================================================================

CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    body TEXT NOT NULL CHECK (json_valid(body) AND json_type(body) = 'object'),
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (collection, id)
);

-- Appointment lookups filter on veterinarian and timestamp
CREATE INDEX IF NOT EXISTS idx_documents_vet_data ON documents(
    collection,
    json_extract(body, '$.veterinario'),
    json_extract(body, '$.data')
);
"#;
