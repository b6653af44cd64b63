//! Schema loading errors

use std::path::PathBuf;

use statecast_shared::KindName;

/// A malformed or inconsistent schema. Always fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("failed to read schema document {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse schema document {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("field '{0}' has no category prefix (expected '<category>.<key>')")]
    MissingCategory(String),

    #[error("field '{field}' uses unknown category '{category}'")]
    UnknownCategory { field: String, category: String },

    #[error("field '{field}': {kind} fields require '{attribute}'")]
    MissingAttribute {
        field: String,
        kind: KindName,
        attribute: &'static str,
    },

    #[error("field '{field}': invalid {attribute} {value} ({reason})")]
    InvalidAttribute {
        field: String,
        attribute: &'static str,
        value: u64,
        reason: &'static str,
    },

    #[error(
        "field '{field}' spans {extent} bytes at {address:#06X}, outside the {memory_size} byte address space"
    )]
    OutOfRange {
        field: String,
        address: u32,
        extent: usize,
        memory_size: usize,
    },

    #[error("field '{field}' references unknown value table '{table}'")]
    UnknownTable { field: String, table: String },

    #[error("value table '{table}' has invalid key '{key}'")]
    InvalidKey { table: String, key: String },

    #[error("value table '{table}' declares key {key} more than once")]
    DuplicateKey { table: String, key: u32 },
}
